mod github;
mod testgrid;

pub use github::GitHubProvider;
pub use testgrid::TestGridProvider;
