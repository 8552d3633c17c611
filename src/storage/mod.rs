pub mod traits;
pub mod seen_file;

pub use seen_file::SeenFileStore;
pub use traits::SeenRepository;
