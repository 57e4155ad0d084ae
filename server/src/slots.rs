//! Player slot management: which mark a participant plays and whether a live
//! connection currently holds it.
//!
//! At most two connections hold slots at once, one per mark. Slots are never
//! deleted; a participant that disconnects leaves its record behind with
//! `connected = false`, and later arrivals recycle it where possible. The
//! slot manager decides mark assignment for both the
//! request/response join path (a *reservation*, no live connection yet) and
//! the realtime attach path, and exposes the roster that gets broadcast to
//! clients.

use crate::broadcast::ConnId;
use log::info;
use shared::{Mark, RosterEntry};
use std::collections::HashMap;

/// Upper bound on connected participants per game, one per mark.
pub const MAX_SLOTS: usize = 2;

/// One participant's seat in a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSlot {
    pub mark: Mark,
    pub connected: bool,
    /// Live connection currently holding the slot, if any.
    pub conn: Option<ConnId>,
    /// Identity of the client occupying the slot, if it supplied one.
    pub client_id: Option<String>,
}

impl PlayerSlot {
    fn reserved(mark: Mark) -> Self {
        Self {
            mark,
            connected: false,
            conn: None,
            client_id: None,
        }
    }
}

/// Why a reservation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameFull;

/// Successful attach: the assigned mark and, when the same identity already
/// held a live connection in this game, the connection it displaced. The
/// caller must drop the displaced connection from the fan-out set and close
/// it, or it lingers as a ghost recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub mark: Mark,
    pub displaced: Option<ConnId>,
}

/// Owner of all slot records, keyed by game identifier.
#[derive(Debug, Default)]
pub struct SlotManager {
    slots: HashMap<String, Vec<PlayerSlot>>,
}

impl SlotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a slot list exists for a newly created game.
    pub fn register_game(&mut self, game_id: &str) {
        self.slots.entry(game_id.to_owned()).or_default();
    }

    /// All slot records for a game, in creation order.
    pub fn slots(&self, game_id: &str) -> &[PlayerSlot] {
        self.slots.get(game_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn connected_count(&self, game_id: &str) -> usize {
        self.slots(game_id).iter().filter(|s| s.connected).count()
    }

    /// The roster broadcast to clients: mark and connected flag per slot.
    pub fn roster(&self, game_id: &str) -> Vec<RosterEntry> {
        self.slots(game_id)
            .iter()
            .map(|s| RosterEntry {
                player: s.mark,
                connected: s.connected,
            })
            .collect()
    }

    /// Reserves a slot via the request/response join path.
    ///
    /// The reservation has no live connection and no identity; a subsequent
    /// realtime connection is matched against it instead of spawning a
    /// duplicate record. Assignment policy: first slot gets `X`, the second
    /// gets the remaining mark, and once both records exist the first
    /// disconnected slot's mark is preferred (recycling), defaulting to `O`.
    pub fn reserve(&mut self, game_id: &str) -> Result<Mark, GameFull> {
        let slots = self.slots.entry(game_id.to_owned()).or_default();

        if slots.iter().filter(|s| s.connected).count() >= MAX_SLOTS {
            return Err(GameFull);
        }

        let mark = match slots.len() {
            0 => Mark::X,
            1 => slots[0].mark.other(),
            _ => slots
                .iter()
                .find(|s| !s.connected)
                .map(|s| s.mark)
                .unwrap_or(Mark::O),
        };

        slots.push(PlayerSlot::reserved(mark));
        info!("Reserved {} slot in game {}", mark, game_id);
        Ok(mark)
    }

    /// Matches an arriving realtime connection to a slot.
    ///
    /// Matching order: a slot already bound to the same client identity
    /// (reconnection), then an unclaimed reservation, then a brand-new slot
    /// while capacity remains, then any disconnected slot (recycling).
    /// `None` means the game is full and the caller must reject the
    /// connection.
    pub fn attach(
        &mut self,
        game_id: &str,
        client_id: Option<&str>,
        conn: ConnId,
    ) -> Option<Attachment> {
        let slots = self.slots.entry(game_id.to_owned()).or_default();

        if let Some(id) = client_id {
            if let Some(slot) = slots.iter_mut().find(|s| s.client_id.as_deref() == Some(id)) {
                // A still-live connection for the same identity loses its
                // slot to the newer one.
                let displaced = slot.conn.replace(conn);
                slot.connected = true;
                info!("Client {} reattached as {} in game {}", id, slot.mark, game_id);
                return Some(Attachment {
                    mark: slot.mark,
                    displaced,
                });
            }
        }

        if let Some(slot) = slots
            .iter_mut()
            .find(|s| !s.connected && s.conn.is_none() && s.client_id.is_none())
        {
            slot.conn = Some(conn);
            slot.connected = true;
            slot.client_id = client_id.map(str::to_owned);
            return Some(Attachment {
                mark: slot.mark,
                displaced: None,
            });
        }

        if slots.len() < MAX_SLOTS {
            let mark = if slots.is_empty() { Mark::X } else { Mark::O };
            slots.push(PlayerSlot {
                mark,
                connected: true,
                conn: Some(conn),
                client_id: client_id.map(str::to_owned),
            });
            return Some(Attachment {
                mark,
                displaced: None,
            });
        }

        if let Some(slot) = slots.iter_mut().find(|s| !s.connected) {
            slot.conn = Some(conn);
            slot.connected = true;
            slot.client_id = client_id.map(str::to_owned);
            return Some(Attachment {
                mark: slot.mark,
                displaced: None,
            });
        }

        None
    }

    /// Releases the slot held by `conn` after a close or an explicit leave.
    ///
    /// `clear_identity` is set on explicit leave (the client is gone for
    /// good); a plain transport close keeps the identity so the same client
    /// can reclaim its mark on reconnect. Unknown connections are a no-op —
    /// rejected sockets never held a slot.
    pub fn detach(&mut self, game_id: &str, conn: ConnId, clear_identity: bool) -> Option<Mark> {
        let slot = self
            .slots
            .get_mut(game_id)?
            .iter_mut()
            .find(|s| s.conn == Some(conn))?;

        slot.conn = None;
        slot.connected = false;
        if clear_identity {
            slot.client_id = None;
        }
        info!("Player {} detached from game {}", slot.mark, game_id);
        Some(slot.mark)
    }

    /// Forcibly vacates the connected slot bound to `client_id`, used when
    /// the same identity binds to a different game. Clears both the handle
    /// and the identity; returns the mark and the evicted connection, if one
    /// was live.
    pub fn evict(&mut self, game_id: &str, client_id: &str) -> Option<(Mark, Option<ConnId>)> {
        let slot = self
            .slots
            .get_mut(game_id)?
            .iter_mut()
            .find(|s| s.connected && s.client_id.as_deref() == Some(client_id))?;

        let conn = slot.conn.take();
        slot.connected = false;
        slot.client_id = None;
        info!(
            "Evicted client {} ({}) from game {}",
            client_id, slot.mark, game_id
        );
        Some((slot.mark, conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME: &str = "g1";

    fn manager() -> SlotManager {
        let mut m = SlotManager::new();
        m.register_game(GAME);
        m
    }

    #[test]
    fn test_first_reservation_is_x_second_is_o() {
        let mut m = manager();
        assert_eq!(m.reserve(GAME), Ok(Mark::X));
        assert_eq!(m.reserve(GAME), Ok(Mark::O));
        assert_eq!(m.slots(GAME).len(), 2);
        assert_eq!(m.connected_count(GAME), 0);
    }

    #[test]
    fn test_second_reservation_complements_first_mark() {
        let mut m = manager();
        // Socket-first arrival seeds the slot list with X before any
        // reservation exists.
        m.attach(GAME, None, 1);
        assert_eq!(m.reserve(GAME), Ok(Mark::O));
    }

    #[test]
    fn test_reserve_fails_when_two_connected() {
        let mut m = manager();
        m.attach(GAME, None, 1);
        m.attach(GAME, None, 2);
        assert_eq!(m.connected_count(GAME), 2);
        assert_eq!(m.reserve(GAME), Err(GameFull));
    }

    #[test]
    fn test_reserve_recycles_disconnected_mark() {
        let mut m = manager();
        m.attach(GAME, None, 1); // X
        m.attach(GAME, None, 2); // O
        m.detach(GAME, 2, false);

        assert_eq!(m.reserve(GAME), Ok(Mark::O));
        let roster = m.roster(GAME);
        assert_eq!(roster.len(), 3);
        assert!(roster.iter().any(|r| r.player == Mark::O && !r.connected));
    }

    #[test]
    fn test_attach_claims_reservation_before_creating_slot() {
        let mut m = manager();
        m.reserve(GAME).unwrap();

        assert_eq!(m.attach(GAME, Some("c1"), 7).unwrap().mark, Mark::X);
        let slots = m.slots(GAME);
        assert_eq!(slots.len(), 1);
        assert!(slots[0].connected);
        assert_eq!(slots[0].conn, Some(7));
        assert_eq!(slots[0].client_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_attach_without_reservation_creates_slots_in_order() {
        let mut m = manager();
        assert_eq!(m.attach(GAME, None, 1).unwrap().mark, Mark::X);
        assert_eq!(m.attach(GAME, None, 2).unwrap().mark, Mark::O);
        assert_eq!(m.connected_count(GAME), 2);
    }

    #[test]
    fn test_attach_rejected_when_full() {
        let mut m = manager();
        m.attach(GAME, None, 1);
        m.attach(GAME, None, 2);
        assert!(m.attach(GAME, None, 3).is_none());
        assert_eq!(m.slots(GAME).len(), 2);
    }

    #[test]
    fn test_attach_recycles_disconnected_slot_when_full() {
        let mut m = manager();
        m.attach(GAME, Some("a"), 1);
        m.attach(GAME, Some("b"), 2);
        m.detach(GAME, 1, true);

        assert_eq!(m.attach(GAME, Some("c"), 3).unwrap().mark, Mark::X);
        let slot = &m.slots(GAME)[0];
        assert!(slot.connected);
        assert_eq!(slot.conn, Some(3));
        assert_eq!(slot.client_id.as_deref(), Some("c"));
    }

    #[test]
    fn test_attach_matches_identity_for_reconnection() {
        let mut m = manager();
        m.attach(GAME, Some("c1"), 1);
        m.attach(GAME, Some("c2"), 2);

        // c1's transport drops; identity is retained.
        assert_eq!(m.detach(GAME, 1, false), Some(Mark::X));
        assert_eq!(m.slots(GAME)[0].client_id.as_deref(), Some("c1"));

        // The same identity reclaims its old mark, not a new slot, and
        // nothing is displaced because the old handle was already gone.
        let attachment = m.attach(GAME, Some("c1"), 3).unwrap();
        assert_eq!(attachment.mark, Mark::X);
        assert_eq!(attachment.displaced, None);
        assert_eq!(m.slots(GAME).len(), 2);
        assert_eq!(m.slots(GAME)[0].conn, Some(3));
    }

    #[test]
    fn test_attach_same_identity_displaces_live_connection() {
        let mut m = manager();
        m.attach(GAME, Some("c1"), 1);

        // Same identity, same game, while the first connection is still up.
        let attachment = m.attach(GAME, Some("c1"), 2).unwrap();
        assert_eq!(attachment.mark, Mark::X);
        assert_eq!(attachment.displaced, Some(1));

        let slots = m.slots(GAME);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].conn, Some(2));
        assert!(slots[0].connected);

        // The displaced connection no longer matches any slot.
        assert_eq!(m.detach(GAME, 1, false), None);
    }

    #[test]
    fn test_detach_on_leave_clears_identity() {
        let mut m = manager();
        m.attach(GAME, Some("c1"), 1);
        assert_eq!(m.detach(GAME, 1, true), Some(Mark::X));

        let slot = &m.slots(GAME)[0];
        assert!(!slot.connected);
        assert_eq!(slot.conn, None);
        assert_eq!(slot.client_id, None);
    }

    #[test]
    fn test_detach_unknown_connection_is_noop() {
        let mut m = manager();
        m.attach(GAME, None, 1);
        assert_eq!(m.detach(GAME, 99, true), None);
        assert_eq!(m.detach("other", 1, true), None);
        assert!(m.slots(GAME)[0].connected);
    }

    #[test]
    fn test_evict_clears_connection_and_identity() {
        let mut m = manager();
        m.attach(GAME, Some("c1"), 5);

        assert_eq!(m.evict(GAME, "c1"), Some((Mark::X, Some(5))));
        let slot = &m.slots(GAME)[0];
        assert!(!slot.connected);
        assert_eq!(slot.conn, None);
        assert_eq!(slot.client_id, None);
    }

    #[test]
    fn test_evict_ignores_disconnected_and_unknown_identities() {
        let mut m = manager();
        m.attach(GAME, Some("c1"), 5);
        m.detach(GAME, 5, false);

        // Slot exists but is not connected: nothing to evict.
        assert_eq!(m.evict(GAME, "c1"), None);
        assert_eq!(m.evict(GAME, "stranger"), None);
    }

    #[test]
    fn test_roster_reflects_connection_flags() {
        let mut m = manager();
        m.reserve(GAME).unwrap();
        m.attach(GAME, None, 1);
        m.reserve(GAME).unwrap();

        let roster = m.roster(GAME);
        assert_eq!(
            roster,
            vec![
                RosterEntry {
                    player: Mark::X,
                    connected: true
                },
                RosterEntry {
                    player: Mark::O,
                    connected: false
                },
            ]
        );
    }

    #[test]
    fn test_never_more_than_two_connected() {
        let mut m = manager();
        for conn in 0..10 {
            m.attach(GAME, None, conn);
        }
        assert_eq!(m.connected_count(GAME), 2);
        assert_eq!(m.slots(GAME).len(), 2);
    }
}
