use crate::player::Player;

/// How many entries the high-score rendering shows.
pub const TOP_LIMIT: usize = 11;

/// Orders players by score descending. Ties keep join order, so two
/// successive renderings agree unless a score changed in between.
pub fn ranked<'a, I>(players: I) -> Vec<&'a Player>
where
    I: IntoIterator<Item = &'a Player>,
{
    let mut list: Vec<&Player> = players.into_iter().collect();
    list.sort_by(|a, b| {
        b.score()
            .cmp(&a.score())
            .then(a.joined_seq().cmp(&b.joined_seq()))
    });
    list
}

/// Renders the top of the ranking as numbered "name: score" lines.
pub fn high_score_lines(ranked: &[&Player]) -> String {
    let mut text = String::new();
    for (i, player) in ranked.iter().take(TOP_LIMIT).enumerate() {
        text.push_str(&format!(
            "{}. {}: {}\n",
            i + 1,
            player.display_name(),
            player.score()
        ));
    }
    text
}
