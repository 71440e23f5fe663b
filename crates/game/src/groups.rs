//! Transient adventuring groups.
//!
//! Groups are not persisted; they live exactly as long as they have
//! members. The [`GroupManager`] owns every live group along with the
//! member index that enforces the one-group-per-character rule.

use std::{collections::HashMap, fmt};

use derive_more::{Display, From, Into};
use tracing::warn;

use crate::characters::CharacterId;

#[derive(Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, From, Into)]
pub struct GroupId(pub u32);

#[derive(Debug, Clone)]
pub struct Group {
    id: GroupId,
    founder: CharacterId,
    members: Vec<CharacterId>,
}

impl Group {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn founder(&self) -> CharacterId {
        self.founder
    }

    pub fn members(&self) -> &[CharacterId] {
        &self.members
    }

    pub fn contains(&self, member: CharacterId) -> bool {
        self.members.contains(&member)
    }
}

/// Receives group lifecycle notifications. `group_disbanded` is always
/// the last notification fired for a group; the group is dropped right
/// after it returns.
pub trait GroupObserver {
    fn group_created(&mut self, group: &Group) {
        let _ = group;
    }

    fn member_added(&mut self, group: &Group, member: CharacterId) {
        let _ = (group, member);
    }

    fn member_removed(&mut self, group: &Group, member: CharacterId) {
        let _ = (group, member);
    }

    fn group_disbanded(&mut self, group: &Group) {
        let _ = group;
    }
}

pub struct GroupManager {
    groups: HashMap<GroupId, Group>,
    members: HashMap<CharacterId, GroupId>,
    next_id: u32,
    observers: Vec<Box<dyn GroupObserver + Send + Sync>>,
}

impl GroupManager {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            members: HashMap::new(),
            next_id: 0,
            observers: Vec::new(),
        }
    }

    pub fn observe(&mut self, observer: Box<dyn GroupObserver + Send + Sync>) {
        self.observers.push(observer);
    }

    /// All live groups, in no particular order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn group_of(&self, member: CharacterId) -> Option<&Group> {
        self.members.get(&member).and_then(|id| self.groups.get(id))
    }

    /// Creates a new group founded by `founder`, or `None` if they are
    /// already in one.
    pub fn try_create_group(&mut self, founder: CharacterId) -> Option<GroupId> {
        if self.members.contains_key(&founder) {
            return None;
        }

        let id = GroupId(self.next_id);
        self.next_id += 1;

        self.members.insert(founder, id);
        self.groups.insert(
            id,
            Group {
                id,
                founder,
                members: vec![founder],
            },
        );

        let Self {
            groups, observers, ..
        } = self;
        if let Some(group) = groups.get(&id) {
            for observer in observers.iter_mut() {
                observer.group_created(group);
            }
        }

        Some(id)
    }

    /// Adds `target` to `group`. An invite is a synchronous add: there is
    /// no pending state, and it fails if the target is in any group,
    /// including this one.
    pub fn try_invite(&mut self, group: GroupId, target: CharacterId) -> bool {
        if self.members.contains_key(&target) {
            return false;
        }

        let Self {
            groups,
            members,
            observers,
            ..
        } = self;
        let entry = match groups.get_mut(&group) {
            Some(entry) => entry,
            None => {
                warn!(%group, "invited {target} to a group that does not exist");
                return false;
            }
        };

        entry.members.push(target);
        members.insert(target, group);

        for observer in observers.iter_mut() {
            observer.member_added(entry, target);
        }

        true
    }

    /// Removes `member` from their group, disbanding it if they were the
    /// last member. Returns false if they were not in a group.
    pub fn remove_member(&mut self, member: CharacterId) -> bool {
        let id = match self.members.remove(&member) {
            Some(id) => id,
            None => return false,
        };

        let Self {
            groups, observers, ..
        } = self;
        let group = match groups.get_mut(&id) {
            Some(group) => group,
            None => {
                warn!(%id, "member {member} pointed at a group that does not exist");
                return false;
            }
        };

        group.members.retain(|m| *m != member);
        for observer in observers.iter_mut() {
            observer.member_removed(group, member);
        }

        if group.members.is_empty() {
            self.disband(id);
        }

        true
    }

    /// Disbands `group`, detaching all remaining members. The disband
    /// notification is the last event fired before the group is dropped.
    pub fn disband(&mut self, group: GroupId) -> bool {
        let group = match self.groups.remove(&group) {
            Some(group) => group,
            None => {
                warn!(%group, "tried to disband a group that is not registered");
                return false;
            }
        };

        for member in &group.members {
            self.members.remove(member);
        }
        for observer in self.observers.iter_mut() {
            observer.group_disbanded(&group);
        }

        true
    }
}

impl Default for GroupManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GroupManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupManager")
            .field("groups", &self.groups)
            .field("members", &self.members)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::{Group, GroupManager, GroupObserver};
    use crate::characters::CharacterId;

    const ALICE: CharacterId = CharacterId(1);
    const BOB: CharacterId = CharacterId(2);
    const CAROL: CharacterId = CharacterId(3);

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.0.lock().expect("poisoned").clone()
        }

        fn push(&self, event: String) {
            self.0.lock().expect("poisoned").push(event);
        }
    }

    impl GroupObserver for Recorder {
        fn group_created(&mut self, group: &Group) {
            self.push(format!("created {}", group.id()));
        }

        fn member_added(&mut self, group: &Group, member: CharacterId) {
            self.push(format!("added {member} to {}", group.id()));
        }

        fn member_removed(&mut self, group: &Group, member: CharacterId) {
            self.push(format!("removed {member} from {}", group.id()));
        }

        fn group_disbanded(&mut self, group: &Group) {
            self.push(format!("disbanded {}", group.id()));
        }
    }

    #[test]
    fn a_character_belongs_to_at_most_one_group() {
        let mut manager = GroupManager::new();

        let group = manager.try_create_group(ALICE).expect("not in a group");
        assert!(manager.try_invite(group, BOB));

        // neither a grouped founder nor a grouped invitee may join again
        assert!(manager.try_create_group(ALICE).is_none());
        assert!(manager.try_create_group(BOB).is_none());
        assert!(!manager.try_invite(group, BOB));

        assert_eq!(manager.groups().count(), 1);
        assert!(manager.group_of(BOB).map(Group::id) == Some(group));
    }

    #[test]
    fn removing_the_last_member_disbands_the_group() {
        let mut manager = GroupManager::new();
        let group = manager.try_create_group(ALICE).expect("not in a group");
        assert!(manager.try_invite(group, BOB));

        assert!(manager.remove_member(ALICE));
        assert!(manager.group(group).is_some());

        assert!(manager.remove_member(BOB));
        assert!(manager.group(group).is_none());
        assert_eq!(manager.groups().count(), 0);

        // both are free to regroup
        assert!(manager.try_create_group(BOB).is_some());
    }

    #[test]
    fn disband_notification_fires_last() {
        let recorder = Recorder::default();
        let mut manager = GroupManager::new();
        manager.observe(Box::new(recorder.clone()));

        let group = manager.try_create_group(ALICE).expect("not in a group");
        assert!(manager.remove_member(ALICE));

        assert_eq!(
            recorder.events(),
            vec![
                format!("created {group}"),
                format!("removed {ALICE} from {group}"),
                format!("disbanded {group}"),
            ]
        );
    }

    #[test]
    fn explicit_disband_detaches_every_member() {
        let mut manager = GroupManager::new();
        let group = manager.try_create_group(ALICE).expect("not in a group");
        assert!(manager.try_invite(group, BOB));
        assert!(manager.try_invite(group, CAROL));

        assert!(manager.disband(group));

        assert!(manager.group_of(ALICE).is_none());
        assert!(manager.group_of(CAROL).is_none());
        assert!(!manager.disband(group));
    }

    #[test]
    fn a_manager_with_observers_moves_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GroupManager>();
    }

    #[test]
    fn removing_an_ungrouped_character_is_a_noop() {
        let mut manager = GroupManager::new();
        assert!(!manager.remove_member(ALICE));
    }
}
