//! Domain types for systems, categories, users, tickets and their audit log

mod builders;
mod outcome;
mod system;
mod ticket;
mod user;

pub use builders::{CreateTicketBuilder, TicketQueryBuilder};
pub use outcome::Outcome;
pub use system::{Category, CategoryKey, CategoryView, Membership, System};
pub(crate) use ticket::Report;
pub use ticket::{
    CreateTicket, CreatedTicket, LogEntry, Page, Ticket, TicketChange, TicketDetails,
    TicketFilter, TicketKey, TicketQuery, TicketRow, TicketStatus, UserFilter,
};
pub use user::{NewUser, Role, User, UserChange, digest_password};
pub(crate) use user::non_blank;
