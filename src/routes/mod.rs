mod health_check;
mod newsletter;
mod sitemap;

pub use health_check::*;
pub use newsletter::*;
pub use sitemap::*;

/// Walk the `source` chain of an error, so that `Debug` output (which is what
/// `TracingLogger` records) shows every cause, not just the outermost one.
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
