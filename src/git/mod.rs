pub mod fetcher;

#[cfg(test)]
pub mod fixtures;

pub use fetcher::RepositoryFetcher;
