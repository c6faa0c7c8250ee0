pub mod load_upstreams;

pub use load_upstreams::LoadUpstreamsUseCase;
