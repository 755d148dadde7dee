pub mod memory;
pub mod scheduling;
pub mod supabase;

pub use memory::InMemoryDatabase;
pub use scheduling::AppointmentService;
pub use supabase::SupabaseDatabase;
