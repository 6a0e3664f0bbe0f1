//! Input ingestion.

use crate::entity::Player;
use protocol::packets::InputPayload;

/// Merge a client input into the player's pending frame.
///
/// Movement and aim replace the previous values; shoot and dash stay pending
/// until the simulation consumes them.
pub fn apply(player: &mut Player, payload: &InputPayload, now: f64) {
    player.input.ingest(payload);
    player.last_input_at = now;
    player.last_seq = player.last_seq.max(payload.seq);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::{quiet_config, spawn, world};
    use glam::Vec2;

    #[test]
    fn test_apply_tracks_seq_and_time() {
        let config = quiet_config();
        let mut w = world(&config);
        let id = spawn(&mut w, &config, Vec2::ZERO);
        let p = w.player_mut(id).unwrap();

        apply(p, &InputPayload { seq: 5, dash: true, ..Default::default() }, 100.0);
        apply(p, &InputPayload { seq: 4, move_x: 1.0, ..Default::default() }, 120.0);

        assert_eq!(p.last_seq, 5);
        assert_eq!(p.last_input_at, 120.0);
        assert!(p.input.dash);
        assert_eq!(p.input.move_dir, Vec2::X);
    }
}
