mod capture;
mod inspect;
mod reconstruct;

pub use capture::run_capture;
pub use inspect::run_inspect;
pub use reconstruct::run_reconstruct;
