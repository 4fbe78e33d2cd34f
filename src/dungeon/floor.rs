//! Floor generation
//!
//! Maze carving over the odd-coordinate lattice, opportunistic placement of
//! encounters/caches/puzzles while carving, then a bounded exit search with
//! deterministic fallbacks. Generation never fails: degenerate sizes produce
//! a minimal open floor and log the anomaly.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{
    EncounterType, EntityCatalog, GuardianSpec, ModuleSummary, PhaseType, CACHE_LOOT_TABLE,
};
use crate::core::config::GenerationConfig;
use crate::core::types::{Direction, EncounterId, Position};
use crate::dungeon::cell::{CellType, MapCell};
use crate::dungeon::encounter::{
    build_boss, build_encounter, EncounterContext, EncounterDefinition, MAX_ENCOUNTER_DIFFICULTY,
};

/// Smallest side length that gets a carved maze
pub const MIN_CARVED_SIDE: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub level: u32,
    pub width: u32,
    pub height: u32,
    pub phase: PhaseType,
    pub difficulty: u32,
    /// Row-major, `width × height`
    pub cells: Vec<MapCell>,
    pub entry_position: Position,
    pub exit_position: Position,
    pub encounters: Vec<EncounterDefinition>,
}

impl Floor {
    fn filled(level: u32, width: u32, height: u32, phase: PhaseType, cell: MapCell) -> Self {
        Self {
            level,
            width,
            height,
            phase,
            difficulty: 1,
            cells: vec![cell; (width * height) as usize],
            entry_position: Position::default(),
            exit_position: Position::default(),
            encounters: Vec::new(),
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn cell(&self, pos: Position) -> Option<&MapCell> {
        self.index(pos).and_then(|i| self.cells.get(i))
    }

    pub fn cell_mut(&mut self, pos: Position) -> Option<&mut MapCell> {
        self.index(pos).and_then(move |i| self.cells.get_mut(i))
    }

    pub fn is_walkable(&self, pos: Position) -> bool {
        self.cell(pos).is_some_and(|c| c.walkable)
    }

    pub fn encounter(&self, id: &EncounterId) -> Option<&EncounterDefinition> {
        self.encounters.iter().find(|e| &e.id == id)
    }

    pub fn encounter_mut(&mut self, id: &EncounterId) -> Option<&mut EncounterDefinition> {
        self.encounters.iter_mut().find(|e| &e.id == id)
    }

    /// All positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let width = self.width as i32;
        (0..self.height as i32).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
    }

    pub fn walkable_neighbors(&self, pos: Position) -> Vec<Position> {
        Direction::ALL
            .iter()
            .map(|d| pos.step(*d))
            .filter(|p| self.is_walkable(*p))
            .collect()
    }

    /// Shortest walkable path (breadth-first), inclusive of both ends
    pub fn find_path(&self, start: Position, goal: Position) -> Option<Vec<Position>> {
        if !self.is_walkable(start) || !self.is_walkable(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let mut came_from: Vec<Option<Position>> = vec![None; self.cells.len()];
        let mut seen = vec![false; self.cells.len()];
        let mut queue = VecDeque::new();

        seen[self.index(start)?] = true;
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if current == goal {
                let mut path = vec![goal];
                let mut cursor = goal;
                while let Some(prev) = self.index(cursor).and_then(|i| came_from[i]) {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            for next in self.walkable_neighbors(current) {
                if let Some(i) = self.index(next) {
                    if !seen[i] {
                        seen[i] = true;
                        came_from[i] = Some(current);
                        queue.push_back(next);
                    }
                }
            }
        }
        None
    }

    /// ASCII map, `@` at `player` if given
    pub fn render(&self, player: Option<Position>, fogged: bool) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.height as usize);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pos = Position::new(x, y);
                let glyph = match self.cell(pos) {
                    _ if Some(pos) == player => '@',
                    Some(cell) if fogged && !cell.explored => ' ',
                    Some(cell) => cell.cell_type.glyph(),
                    None => ' ',
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

/// Everything `generate_floor` needs besides the catalog and config
#[derive(Debug, Clone)]
pub struct FloorRequest<'a> {
    pub level: u32,
    pub width: u32,
    pub height: u32,
    /// Dungeon seed; the floor RNG is derived from it and the level
    pub dungeon_seed: u64,
    /// Added to the phase difficulty
    pub difficulty_bonus: u32,
    pub module: Option<&'a ModuleSummary>,
    /// Present only for a finite dungeon's final floor
    pub guardian: Option<&'a GuardianSpec>,
}

/// Per-floor RNG seed
pub fn floor_seed(dungeon_seed: u64, level: u32) -> u64 {
    dungeon_seed ^ (level as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Generate one floor
pub fn generate_floor(
    request: &FloorRequest<'_>,
    catalog: &EntityCatalog,
    config: &GenerationConfig,
) -> Floor {
    let mut rng = ChaCha8Rng::seed_from_u64(floor_seed(request.dungeon_seed, request.level));
    let phase = PhaseType::for_level(request.level);
    let difficulty =
        (phase.archetype().difficulty + request.difficulty_bonus).clamp(1, MAX_ENCOUNTER_DIFFICULTY);

    let mut floor = if request.width < MIN_CARVED_SIDE || request.height < MIN_CARVED_SIDE {
        degenerate_floor(request, phase)
    } else {
        carved_floor(request, phase, difficulty, catalog, config, &mut rng)
    };
    floor.difficulty = difficulty;

    if let Some(guardian) = request.guardian {
        attach_guardian(&mut floor, guardian, request.module, catalog);
    }

    tracing::debug!(
        "Generated floor {} ({}) {}x{} with {} encounters",
        floor.level,
        phase.as_str(),
        floor.width,
        floor.height,
        floor.encounters.len()
    );

    floor
}

// ===== DEGENERATE SIZES =====

fn degenerate_floor(request: &FloorRequest<'_>, phase: PhaseType) -> Floor {
    let width = request.width.max(1);
    let height = request.height.max(1);
    tracing::warn!(
        "Floor {} requested at {}x{}, generating minimal {}x{} floor",
        request.level,
        request.width,
        request.height,
        width,
        height
    );

    let mut floor = Floor::filled(request.level, width, height, phase, MapCell::floor());
    let entry = Position::new(0, 0);
    let exit = Position::new(width as i32 - 1, height as i32 - 1);

    floor.entry_position = entry;
    floor.exit_position = exit;
    if exit != entry {
        if let Some(cell) = floor.cell_mut(exit) {
            cell.set_type(CellType::Exit);
        }
    }
    if let Some(cell) = floor.cell_mut(entry) {
        cell.set_type(CellType::Entrance);
    }
    floor
}

// ===== CARVING =====

fn carved_floor(
    request: &FloorRequest<'_>,
    phase: PhaseType,
    difficulty: u32,
    catalog: &EntityCatalog,
    config: &GenerationConfig,
    rng: &mut ChaCha8Rng,
) -> Floor {
    let (width, height) = (request.width, request.height);
    let mut floor = Floor::filled(request.level, width, height, phase, MapCell::wall());
    let archetype = phase.archetype();

    // Odd interior coordinates form the carving lattice
    let odd_x = ((width - 1) / 2) as i32;
    let odd_y = ((height - 1) / 2) as i32;
    let start = Position::new(1 + 2 * rng.gen_range(0..odd_x), 1 + 2 * rng.gen_range(0..odd_y));

    floor.entry_position = start;
    if let Some(cell) = floor.cell_mut(start) {
        cell.set_type(CellType::Entrance);
    }

    let interior = |p: Position| {
        p.x >= 1 && p.y >= 1 && p.x <= width as i32 - 2 && p.y <= height as i32 - 2
    };

    let budget = ((config.carve_ratio * (width * height) as f64).round() as usize).max(1);
    let mut stack = vec![start];
    let mut steps = 0;
    let mut encounter_index = 0;

    while steps < budget {
        let Some(&current) = stack.last() else {
            break;
        };

        let options: Vec<Direction> = Direction::ALL
            .iter()
            .copied()
            .filter(|d| {
                let target = current.offset(*d, 2);
                interior(target)
                    && floor
                        .cell(target)
                        .is_some_and(|c| c.cell_type == CellType::Wall)
            })
            .collect();

        let Some(&direction) = options.choose(rng) else {
            stack.pop();
            continue;
        };

        let between = current.step(direction);
        let target = current.offset(direction, 2);
        for pos in [between, target] {
            if let Some(cell) = floor.cell_mut(pos) {
                cell.set_type(CellType::Floor);
            }
        }
        stack.push(target);
        steps += 1;

        // ===== PLACEMENT =====
        let roll: f64 = rng.gen();
        let encounter_cut = config.encounter_chance;
        let cache_cut = encounter_cut + config.item_cache_chance;
        let puzzle_cut = cache_cut + config.puzzle_chance;

        if roll < encounter_cut {
            let Some(&encounter_type) = archetype.allowed_encounters.choose(rng) else {
                continue;
            };
            let ctx = EncounterContext {
                level: request.level,
                index: encounter_index,
                position: target,
                difficulty,
                module: request.module,
                catalog,
            };
            let encounter = build_encounter(encounter_type, &ctx, rng);
            place_encounter(&mut floor, encounter, CellType::Encounter);
            encounter_index += 1;
        } else if roll < cache_cut {
            let item = CACHE_LOOT_TABLE[rng.gen_range(0..CACHE_LOOT_TABLE.len())];
            if let Some(cell) = floor.cell_mut(target) {
                cell.set_type(CellType::ItemCache);
                cell.item_id = Some(item.to_string());
            }
        } else if archetype.allows_puzzles && roll < puzzle_cut {
            let ctx = EncounterContext {
                level: request.level,
                index: encounter_index,
                position: target,
                difficulty,
                module: request.module,
                catalog,
            };
            let encounter = build_encounter(EncounterType::Puzzle, &ctx, rng);
            place_encounter(&mut floor, encounter, CellType::ArtifactPuzzle);
            encounter_index += 1;
        }
    }

    let exit = place_exit(&mut floor, config, rng);
    floor.exit_position = exit;
    if let Some(cell) = floor.cell_mut(exit) {
        cell.set_type(CellType::Exit);
    }
    floor
}

fn place_encounter(floor: &mut Floor, encounter: EncounterDefinition, cell_type: CellType) {
    if let Some(cell) = floor.cell_mut(encounter.position) {
        cell.set_type(cell_type);
        cell.encounter_id = Some(encounter.id.clone());
        floor.encounters.push(encounter);
    }
}

// ===== EXIT PLACEMENT =====

fn place_exit(floor: &mut Floor, config: &GenerationConfig, rng: &mut ChaCha8Rng) -> Position {
    let entry = floor.entry_position;
    let candidates: Vec<Position> = floor
        .positions()
        .filter(|p| *p != entry && floor.cell(*p).is_some_and(|c| c.is_plain_floor()))
        .collect();

    // Bounded random search for a far-enough plain cell
    if !candidates.is_empty() {
        for _ in 0..config.max_exit_attempts {
            let Some(&pick) = candidates.choose(rng) else {
                break;
            };
            if pick.manhattan(&entry) >= config.min_exit_distance {
                return pick;
            }
        }
    }

    // Fallback 1: nearest walkable cell other than the entrance
    let nearest = floor
        .positions()
        .filter(|p| *p != entry && floor.is_walkable(*p))
        .min_by_key(|p| {
            let plain = floor.cell(*p).is_some_and(|c| c.is_plain_floor());
            (p.manhattan(&entry), !plain)
        });
    if let Some(pos) = nearest {
        tracing::warn!(
            "Floor {}: no exit at distance >= {} after {} attempts, using nearest cell {:?}",
            floor.level,
            config.min_exit_distance,
            config.max_exit_attempts,
            pos
        );
        strip_payload(floor, pos);
        return pos;
    }

    // Fallback 2: nothing beyond the entrance was carved
    let carved = Direction::ALL
        .iter()
        .map(|d| entry.step(*d))
        .find(|p| floor.in_bounds(*p));
    match carved {
        Some(pos) => {
            tracing::warn!(
                "Floor {}: only the entrance was carved, opening {:?} as exit",
                floor.level,
                pos
            );
            if let Some(cell) = floor.cell_mut(pos) {
                cell.set_type(CellType::Floor);
            }
            pos
        }
        None => {
            tracing::warn!("Floor {}: no room for a distinct exit", floor.level);
            entry
        }
    }
}

/// Clear a cell's payload so it can become the exit
fn strip_payload(floor: &mut Floor, pos: Position) {
    let removed = floor.cell_mut(pos).and_then(|cell| {
        let encounter = cell.encounter_id.take();
        cell.clear();
        encounter
    });
    if let Some(id) = removed {
        floor.encounters.retain(|e| e.id != id);
    }
}

// ===== GUARDIAN =====

fn attach_guardian(
    floor: &mut Floor,
    guardian: &GuardianSpec,
    module: Option<&ModuleSummary>,
    catalog: &EntityCatalog,
) {
    let exit = floor.exit_position;
    if exit == floor.entry_position {
        tracing::warn!(
            "Floor {} has no distinct exit, guardian '{}' not placed",
            floor.level,
            guardian.id
        );
        return;
    }

    strip_payload(floor, exit);
    let ctx = EncounterContext {
        level: floor.level,
        index: floor.encounters.len(),
        position: exit,
        difficulty: MAX_ENCOUNTER_DIFFICULTY,
        module,
        catalog,
    };
    let mut boss = build_boss(&ctx, guardian);
    boss.id = EncounterId(format!("L{}-BOSS", floor.level));
    place_encounter(floor, boss, CellType::FloorBoss);
}
