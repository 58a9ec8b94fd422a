pub mod feedback;
pub mod ticket;
