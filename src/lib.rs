/// One imported game, keyed by `name`.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct GameRecord {
    pub name: String,
    pub owner_count: i64,
    pub meta_critic_score: i64,
    pub recommendations: i64,
    pub release_date: String,
    pub required_age: i64,
    pub systems: String,
    pub player_estimate: i64
}

pub type GameName = String;
