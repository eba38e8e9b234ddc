use std::collections::{HashMap, HashSet};

use {
    chrono::{DateTime, TimeDelta, Utc},
    dynstage_platform::{ChannelId, CommunityId, PlatformGateway, UserId},
    tracing::{info, warn},
};

use crate::{
    error::{Result, StageError},
    pair::DynamicResourcePair,
};

/// Stages tracked for one community, at most one per owner.
///
/// Lives in memory only. After a restart it starts out empty and whatever
/// the previous process left in the category is untracked.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    pairs: HashMap<UserId, DynamicResourcePair>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, owner: UserId) -> Option<&DynamicResourcePair> {
        self.pairs.get(&owner)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Tracked pairs, oldest first.
    pub fn pairs(&self) -> Vec<&DynamicResourcePair> {
        let mut pairs: Vec<_> = self.pairs.values().collect();
        pairs.sort_by_key(|p| (p.created_at, p.owner));
        pairs
    }

    /// Pair owning `channel`, either half.
    pub fn find_by_channel(&self, channel: ChannelId) -> Option<&DynamicResourcePair> {
        self.pairs.values().find(|p| p.owns_channel(channel))
    }

    pub(crate) fn find_by_channel_mut(
        &mut self,
        channel: ChannelId,
    ) -> Option<&mut DynamicResourcePair> {
        self.pairs.values_mut().find(|p| p.owns_channel(channel))
    }

    /// Every channel belonging to a tracked pair.
    pub fn tracked_channels(&self) -> HashSet<ChannelId> {
        self.pairs.values().flat_map(|p| p.channel_ids()).collect()
    }

    pub fn expired_owners(&self, now: DateTime<Utc>, max_age: TimeDelta) -> Vec<UserId> {
        self.pairs()
            .into_iter()
            .filter(|p| p.is_expired(now, max_age))
            .map(|p| p.owner)
            .collect()
    }

    /// Create a stage for `owner` inside `container`.
    ///
    /// Refuses with [`StageError::AlreadyOwned`] when the owner has one; the
    /// entry is only added once both channels exist.
    pub async fn create(
        &mut self,
        gateway: &dyn PlatformGateway,
        community: CommunityId,
        container: ChannelId,
        owner: UserId,
        now: DateTime<Utc>,
    ) -> Result<&DynamicResourcePair> {
        if let Some(existing) = self.pairs.get(&owner) {
            warn!(%community, %owner, stage = %existing, "user already owns a stage");
            return Err(StageError::AlreadyOwned { owner });
        }

        let owner_name = gateway.display_name(community, owner).await?;
        let pair =
            DynamicResourcePair::create(gateway, community, container, owner, owner_name, now)
                .await?;
        Ok(self.pairs.entry(owner).or_insert(pair))
    }

    /// Delete `owner`'s stage.
    ///
    /// Without `force` an occupied stage is refused and left untouched.
    /// Channel deletion failures are logged; the entry is dropped either way.
    pub async fn destroy(
        &mut self,
        gateway: &dyn PlatformGateway,
        community: CommunityId,
        owner: UserId,
        force: bool,
    ) -> Result<()> {
        let pair = self
            .pairs
            .get(&owner)
            .ok_or(StageError::NotOwned { owner })?;
        if !force {
            pair.ensure_vacant(gateway, community).await?;
        }

        let failed = pair.delete_channels(gateway, community).await;
        if failed > 0 {
            warn!(%community, %owner, failed, "stage removed with leftover channels");
        }
        self.pairs.remove(&owner);
        Ok(())
    }

    /// Delete every tracked stage. Without `force`, occupied stages are
    /// skipped and keep their channels. The registry is empty afterwards in
    /// both cases; whatever was left behind is untracked from then on.
    pub async fn destroy_all(
        &mut self,
        gateway: &dyn PlatformGateway,
        community: CommunityId,
        force: bool,
    ) {
        info!(%community, count = self.pairs.len(), force, "deleting all tracked stages");
        for pair in self.pairs.values() {
            if !force && let Err(e) = pair.ensure_vacant(gateway, community).await {
                warn!(%community, owner = %pair.owner, error = %e, "stage kept");
                continue;
            }
            let failed = pair.delete_channels(gateway, community).await;
            if failed > 0 {
                warn!(%community, owner = %pair.owner, failed, "stage removed with leftover channels");
            }
        }
        self.pairs.clear();
    }

    /// Stop tracking `owner`'s stage without touching its channels.
    pub(crate) fn forget(&mut self, owner: UserId) -> Option<DynamicResourcePair> {
        self.pairs.remove(&owner)
    }
}

#[cfg(test)]
mod tests {
    use dynstage_platform::{ChannelInfo, ChannelKind};

    use {super::*, crate::testing::FakeGateway};

    const ALICE: UserId = UserId(100);
    const BOB: UserId = UserId(200);

    async fn setup() -> (std::sync::Arc<FakeGateway>, ChannelInfo, ResourceRegistry) {
        let gateway = FakeGateway::new();
        gateway.add_member(ALICE, "Alice");
        gateway.add_member(BOB, "Bob");
        let category = gateway.add_channel(ChannelKind::Category, "Stages", None);
        (gateway, category, ResourceRegistry::new())
    }

    #[tokio::test]
    async fn second_create_is_refused() {
        let (gateway, category, mut registry) = setup().await;
        let c = FakeGateway::COMMUNITY;

        registry
            .create(&*gateway, c, category.id, ALICE, Utc::now())
            .await
            .unwrap();
        let second = registry
            .create(&*gateway, c, category.id, ALICE, Utc::now())
            .await;

        assert!(matches!(second, Err(StageError::AlreadyOwned { owner }) if owner == ALICE));
        assert_eq!(registry.len(), 1);
        assert_eq!(gateway.children(category.id).len(), 2);
    }

    #[tokio::test]
    async fn destroy_without_stage_is_not_owned() {
        let (gateway, _, mut registry) = setup().await;
        let result = registry
            .destroy(&*gateway, FakeGateway::COMMUNITY, BOB, false)
            .await;
        assert!(matches!(result, Err(StageError::NotOwned { owner }) if owner == BOB));
    }

    #[tokio::test]
    async fn occupied_stage_survives_unforced_destroy() {
        let (gateway, category, mut registry) = setup().await;
        let c = FakeGateway::COMMUNITY;
        let stage = registry
            .create(&*gateway, c, category.id, ALICE, Utc::now())
            .await
            .unwrap()
            .stage
            .id;
        gateway.set_occupants(stage, &[BOB]);
        gateway.clear_calls();

        let result = registry.destroy(&*gateway, c, ALICE, false).await;

        assert!(matches!(result, Err(StageError::Occupied { occupants: 1, .. })));
        assert!(registry.lookup(ALICE).is_some());
        assert_eq!(gateway.children(category.id).len(), 2);
        assert_eq!(gateway.count_calls("delete_channel"), 0);
    }

    #[tokio::test]
    async fn forced_destroy_ignores_occupants() {
        let (gateway, category, mut registry) = setup().await;
        let c = FakeGateway::COMMUNITY;
        let stage = registry
            .create(&*gateway, c, category.id, ALICE, Utc::now())
            .await
            .unwrap()
            .stage
            .id;
        gateway.set_occupants(stage, &[BOB]);

        registry.destroy(&*gateway, c, ALICE, true).await.unwrap();

        assert!(registry.lookup(ALICE).is_none());
        assert!(gateway.children(category.id).is_empty());
    }

    #[tokio::test]
    async fn destroy_drops_entry_despite_failed_deletion() {
        let (gateway, category, mut registry) = setup().await;
        let c = FakeGateway::COMMUNITY;
        let text = registry
            .create(&*gateway, c, category.id, ALICE, Utc::now())
            .await
            .unwrap()
            .text
            .id;
        gateway.fail_deletion_of(text);

        registry.destroy(&*gateway, c, ALICE, false).await.unwrap();

        assert!(registry.is_empty());
        assert_eq!(gateway.count_calls("delete_channel"), 2);
    }

    #[tokio::test]
    async fn destroy_all_clears_registry() {
        let (gateway, category, mut registry) = setup().await;
        let c = FakeGateway::COMMUNITY;
        for owner in [ALICE, BOB] {
            registry
                .create(&*gateway, c, category.id, owner, Utc::now())
                .await
                .unwrap();
        }
        let bob_stage = registry.lookup(BOB).unwrap().stage.id;
        gateway.fail_deletion_of(bob_stage);

        registry.destroy_all(&*gateway, c, true).await;

        assert!(registry.is_empty());
        let left: Vec<_> = gateway
            .children(category.id)
            .into_iter()
            .map(|ch| ch.id)
            .collect();
        assert_eq!(left, vec![bob_stage]);
    }

    #[tokio::test]
    async fn unforced_destroy_all_skips_occupied_stages() {
        let (gateway, category, mut registry) = setup().await;
        let c = FakeGateway::COMMUNITY;
        for owner in [ALICE, BOB] {
            registry
                .create(&*gateway, c, category.id, owner, Utc::now())
                .await
                .unwrap();
        }
        let bob = registry.lookup(BOB).unwrap().clone();
        gateway.set_occupants(bob.stage.id, &[ALICE]);

        registry.destroy_all(&*gateway, c, false).await;

        assert!(registry.is_empty());
        let mut left: Vec<_> = gateway
            .children(category.id)
            .into_iter()
            .map(|ch| ch.id)
            .collect();
        left.sort();
        let mut expected = bob.channel_ids().to_vec();
        expected.sort();
        assert_eq!(left, expected);
    }

    #[tokio::test]
    async fn lookup_by_either_channel() {
        let (gateway, category, mut registry) = setup().await;
        let pair = registry
            .create(&*gateway, FakeGateway::COMMUNITY, category.id, ALICE, Utc::now())
            .await
            .unwrap()
            .clone();

        assert_eq!(registry.find_by_channel(pair.stage.id).unwrap().owner, ALICE);
        assert_eq!(registry.find_by_channel(pair.text.id).unwrap().owner, ALICE);
        assert!(registry.find_by_channel(category.id).is_none());
        assert_eq!(
            registry.tracked_channels(),
            HashSet::from([pair.stage.id, pair.text.id])
        );
    }

    #[tokio::test]
    async fn expired_owners_only_lists_old_pairs() {
        let (gateway, category, mut registry) = setup().await;
        let c = FakeGateway::COMMUNITY;
        let now = Utc::now();
        registry
            .create(&*gateway, c, category.id, ALICE, now - TimeDelta::minutes(90))
            .await
            .unwrap();
        registry
            .create(&*gateway, c, category.id, BOB, now - TimeDelta::minutes(5))
            .await
            .unwrap();

        assert_eq!(
            registry.expired_owners(now, TimeDelta::minutes(60)),
            vec![ALICE]
        );
    }
}
