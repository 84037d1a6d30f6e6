// Fixture generation: round-robin pair enumeration replicated to a target
// number of matches per player, in both directions.

use serde::Serialize;

/// A scheduled match produced ahead of play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    pub id: String,
    pub player_a_id: String,
    pub player_b_id: String,
}

/// Number of unordered pairs among `player_count` players: n(n-1)/2.
pub fn total_pairs(player_count: usize) -> usize {
    if player_count < 2 {
        0
    } else {
        player_count.saturating_mul(player_count - 1) / 2
    }
}

/// How many times each pair meets in each direction.
///
/// Truncates: a target below `total_pairs` yields 0.
pub fn matches_per_pair(player_count: usize, matches_per_player: usize) -> usize {
    match total_pairs(player_count) {
        0 => 0,
        pairs => matches_per_player / pairs,
    }
}

/// Generate round-robin index pairings (all vs all).
///
/// Returns every (i, j) with i < j, ordered by i then j.
pub fn round_robin_pairs(player_count: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(total_pairs(player_count));
    for i in 0..player_count {
        for j in (i + 1)..player_count {
            pairs.push((i, j));
        }
    }
    pairs
}

pub fn fixture_id(tournament_id: &str, a: usize, b: usize, repetition: usize) -> String {
    format!("match_{tournament_id}_{a}_{b}_{repetition}")
}

/// Generate the full fixture list for a tournament.
///
/// For every pair (i < j) and repetition k, emits i-vs-j followed by j-vs-i.
/// Ids are derived from the tournament id, the two indices and k, so they are
/// unique within a tournament. Callers bound `matches_per_player` with
/// [`max_matches_per_player`].
pub fn generate_fixtures(
    tournament_id: &str,
    player_ids: &[String],
    matches_per_player: usize,
) -> Vec<Fixture> {
    let reps = matches_per_pair(player_ids.len(), matches_per_player);
    let capacity = total_pairs(player_ids.len())
        .checked_mul(reps)
        .and_then(|n| n.checked_mul(2))
        .unwrap_or(0);
    let mut fixtures = Vec::with_capacity(capacity);

    for (i, j) in round_robin_pairs(player_ids.len()) {
        for k in 0..reps {
            fixtures.push(Fixture {
                id: fixture_id(tournament_id, i, j, k),
                player_a_id: player_ids[i].clone(),
                player_b_id: player_ids[j].clone(),
            });
            fixtures.push(Fixture {
                id: fixture_id(tournament_id, j, i, k),
                player_a_id: player_ids[j].clone(),
                player_b_id: player_ids[i].clone(),
            });
        }
    }
    fixtures
}

/// Valid matches-per-player totals offered when creating a tournament.
///
/// Each pair plays an even number of times (2, 4, ... 12) while the total
/// stays within 24 per rostered player.
pub fn matches_per_player_options(player_count: usize) -> Vec<usize> {
    let pairs = total_pairs(player_count);
    let cap = player_count.saturating_mul(24);
    let options: Vec<usize> = (2..=12)
        .step_by(2)
        .map(|multiplier| pairs.saturating_mul(multiplier))
        .take_while(|total| *total <= cap)
        .collect();

    if options.is_empty() {
        vec![pairs.saturating_mul(2)]
    } else {
        options
    }
}

/// Largest matches-per-player total accepted for `player_count` players.
pub fn max_matches_per_player(player_count: usize) -> usize {
    matches_per_player_options(player_count)
        .last()
        .copied()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("p{i}")).collect()
    }

    #[test]
    fn test_total_pairs() {
        assert_eq!(total_pairs(0), 0);
        assert_eq!(total_pairs(1), 0);
        assert_eq!(total_pairs(2), 1);
        assert_eq!(total_pairs(3), 3);
        assert_eq!(total_pairs(4), 6);
        assert_eq!(total_pairs(8), 28);
    }

    #[test]
    fn test_matches_per_pair_truncates() {
        assert_eq!(matches_per_pair(3, 6), 2);
        assert_eq!(matches_per_pair(3, 7), 2);
        assert_eq!(matches_per_pair(4, 5), 0);
        assert_eq!(matches_per_pair(1, 10), 0);
    }

    #[test]
    fn test_round_robin_4_players() {
        let pairs = round_robin_pairs(4);
        // C(4,2) = 6 pairs
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn test_round_robin_empty() {
        assert!(round_robin_pairs(0).is_empty());
        assert!(round_robin_pairs(1).is_empty());
    }

    #[test]
    fn test_three_players_six_matches_each() {
        let fixtures = generate_fixtures("t1", &ids(3), 6);
        // 3 pairs x 2 reps x 2 directions
        assert_eq!(fixtures.len(), 12);
        assert_eq!(fixtures[0].id, "match_t1_0_1_0");
        assert_eq!(fixtures[0].player_a_id, "p0");
        assert_eq!(fixtures[0].player_b_id, "p1");
        assert_eq!(fixtures[1].id, "match_t1_1_0_0");
        assert_eq!(fixtures[1].player_a_id, "p1");
        assert_eq!(fixtures[1].player_b_id, "p0");
    }

    #[test]
    fn test_fixture_count_formula() {
        for n in 3..=8 {
            for m in [1, 3, 6, 12, 24, 30, 56] {
                let fixtures = generate_fixtures("t", &ids(n), m);
                let pairs = total_pairs(n);
                assert_eq!(fixtures.len(), 2 * pairs * (m / pairs), "n={n} m={m}");
            }
        }
    }

    #[test]
    fn test_directions_are_balanced() {
        let players = ids(4);
        let fixtures = generate_fixtures("t", &players, 12);
        for a in &players {
            for b in &players {
                if a == b {
                    continue;
                }
                let count = fixtures
                    .iter()
                    .filter(|f| &f.player_a_id == a && &f.player_b_id == b)
                    .count();
                assert_eq!(count, 2, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_fixture_ids_unique() {
        let fixtures = generate_fixtures("t", &ids(5), 40);
        let mut seen: Vec<&str> = fixtures.iter().map(|f| f.id.as_str()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), fixtures.len());
    }

    #[test]
    fn test_below_pair_count_generates_nothing() {
        assert!(generate_fixtures("t", &ids(4), 5).is_empty());
    }

    #[test]
    fn test_matches_per_player_options() {
        assert_eq!(matches_per_player_options(3), vec![6, 12, 18, 24, 30, 36]);
        // 8 players: 28 pairs, cap 192
        assert_eq!(matches_per_player_options(8), vec![56, 112, 168]);
        // 20 players: 190 pairs, cap 480
        assert_eq!(matches_per_player_options(20), vec![380]);
        // 60 players: 1770 pairs x 2 exceeds the cap, fall back
        assert_eq!(matches_per_player_options(60), vec![3540]);
    }

    #[test]
    fn test_max_matches_per_player() {
        assert_eq!(max_matches_per_player(3), 36);
        assert_eq!(max_matches_per_player(8), 168);
        assert_eq!(max_matches_per_player(60), 3540);
    }
}
