pub mod advertisements;
pub mod carts;
pub mod categories;
pub mod faqs;
pub mod locations;
pub mod medicines;
pub mod newsletter;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod users;
