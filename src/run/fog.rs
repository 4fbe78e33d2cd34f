//! Fog of war for a single run
//!
//! Each run owns its dungeon copy, so the `explored`/`visited` flags on its
//! cells are that run's map knowledge. Reveal is monotonic: nothing here ever
//! clears a flag.

use crate::core::types::Position;
use crate::dungeon::Floor;

/// Reveal every cell within Chebyshev `radius` of `center`
///
/// Returns how many cells were newly revealed.
pub fn reveal_around(floor: &mut Floor, center: Position, radius: i32) -> usize {
    let radius = radius.max(0);
    let mut revealed = 0;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let pos = Position::new(center.x + dx, center.y + dy);
            if let Some(cell) = floor.cell_mut(pos) {
                if !cell.explored {
                    cell.explored = true;
                    revealed += 1;
                }
            }
        }
    }
    revealed
}

pub fn mark_visited(floor: &mut Floor, pos: Position) {
    if let Some(cell) = floor.cell_mut(pos) {
        cell.visited = true;
        cell.explored = true;
    }
}

pub fn explored_count(floor: &Floor) -> usize {
    floor.cells.iter().filter(|c| c.explored).count()
}

/// Revealed positions in row-major order
pub fn explored_positions(floor: &Floor) -> Vec<Position> {
    floor
        .positions()
        .filter(|p| floor.cell(*p).is_some_and(|c| c.explored))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EntityCatalog;
    use crate::core::config::GenerationConfig;
    use crate::dungeon::{generate_floor, FloorRequest};

    fn floor() -> Floor {
        let catalog = EntityCatalog::builtin();
        let request = FloorRequest {
            level: 1,
            width: 11,
            height: 11,
            dungeon_seed: 5,
            difficulty_bonus: 0,
            module: None,
            guardian: None,
        };
        generate_floor(&request, &catalog, &GenerationConfig::default())
    }

    #[test]
    fn test_reveal_radius_two_is_five_by_five() {
        let mut floor = floor();
        let revealed = reveal_around(&mut floor, Position::new(5, 5), 2);
        assert_eq!(revealed, 25);
        assert_eq!(explored_count(&floor), 25);
        assert!(floor.cell(Position::new(7, 7)).unwrap().explored);
        assert!(!floor.cell(Position::new(8, 5)).unwrap().explored);
    }

    #[test]
    fn test_reveal_clips_at_edges_and_is_idempotent() {
        let mut floor = floor();
        assert_eq!(reveal_around(&mut floor, Position::new(0, 0), 2), 9);
        assert_eq!(reveal_around(&mut floor, Position::new(0, 0), 2), 0);
    }

    #[test]
    fn test_visited_implies_explored() {
        let mut floor = floor();
        mark_visited(&mut floor, Position::new(3, 3));
        let cell = floor.cell(Position::new(3, 3)).unwrap();
        assert!(cell.visited && cell.explored);
    }
}
