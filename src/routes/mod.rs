mod blog;
mod contact;
mod health_check;
mod home;
mod portfolio;
mod posts_api;

pub use blog::*;
pub use contact::*;
pub use health_check::*;
pub use home::*;
pub use portfolio::*;
pub use posts_api::*;

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{e}\n")?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{cause}")?;
        current = cause.source();
    }
    Ok(())
}
