pub mod game_events;
pub mod game_players;
pub mod games;

pub use game_events::Entity as GameEvents;
pub use game_events::Model as GameEvent;
pub use game_players::Entity as GamePlayers;
pub use game_players::Model as GamePlayer;
pub use games::Entity as Games;
pub use games::Model as Game;
