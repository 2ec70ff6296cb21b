//! Workshop ticketing domain
//!
//! Users buy tickets that enroll them in workshops. [`Ticket`] is an
//! aggregate root holding its [`User`] and a collection of [`Workshop`]s,
//! loaded from the `ticket_details` view and written across `tickets` and
//! `enrollments`.
//!
//! Expected schema (SQLite):
//!
//! ```sql
//! CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE,
//!     full_name TEXT NOT NULL, phone TEXT NOT NULL, password TEXT NOT NULL,
//!     created_at TEXT NOT NULL, updated_at TEXT NOT NULL);
//! CREATE TABLE workshops (id INTEGER PRIMARY KEY, title TEXT NOT NULL,
//!     created_at TEXT NOT NULL, updated_at TEXT NOT NULL);
//! CREATE TABLE tickets (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL REFERENCES users(id),
//!     ip_address TEXT NOT NULL, code TEXT NOT NULL UNIQUE,
//!     created_at TEXT NOT NULL, updated_at TEXT NOT NULL);
//! CREATE TABLE enrollments (id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     ticket_id INTEGER NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
//!     workshop_id INTEGER NOT NULL REFERENCES workshops(id));
//! -- ticket_details: tickets JOIN users LEFT JOIN enrollments/workshops,
//! -- user columns prefixed user_, workshop columns prefixed workshop_,
//! -- plus enrollment_id
//! ```

mod ticket;
mod ticket_mapper;
mod user;
mod user_mapper;
pub mod values;
mod workshop;
mod workshop_mapper;

pub use ticket::{Ticket, TicketRelations};
pub use ticket_mapper::TicketMapper;
pub use user::User;
pub use user_mapper::UserMapper;
pub use values::{EmailAddress, InvalidValue, PersonName, PhoneNumber};
pub use workshop::Workshop;
pub use workshop_mapper::WorkshopMapper;
