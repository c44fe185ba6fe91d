//! Domain models.

pub mod testimonial;
pub mod user;

pub use testimonial::{PublicTestimonial, TESTIMONIAL_TYPE, Testimonial};
pub use user::{CreateUser, MemoryUserDirectory, PgUserDirectory, User, UserDirectory};
