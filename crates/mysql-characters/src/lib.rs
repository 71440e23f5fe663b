//! MySQL implementations of the `riftvale-game` persistence traits.

mod characters;
mod guilds;

pub use characters::MySQLCharacterService;
pub use guilds::MySQLGuildService;
