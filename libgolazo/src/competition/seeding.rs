//! Random draw and group partitioning.

use rand::Rng;

/// In-place Fisher-Yates shuffle.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Label of the group at `index`: A, B, ..., Z, AA, AB, ...
pub fn group_label(index: usize) -> String {
    let mut label = String::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        label.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    label
}

/// Deal teams into `ceil(n / size)` groups, team i going to group i mod g.
///
/// Group sizes never differ by more than one. `size` of zero is treated as
/// one group holding everybody.
pub fn partition_groups(teams: &[String], size: usize) -> Vec<(String, Vec<String>)> {
    if teams.is_empty() {
        return Vec::new();
    }

    let count = if size == 0 {
        1
    } else {
        teams.len().div_ceil(size)
    };

    let mut groups: Vec<(String, Vec<String>)> =
        (0..count).map(|i| (group_label(i), Vec::new())).collect();

    for (i, team) in teams.iter().enumerate() {
        groups[i % count].1.push(team.clone());
    }

    groups
}
