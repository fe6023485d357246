use tracing::{debug, warn};

use crate::{context::SkillContext, store::get_non_empty};

/// Memory key holding the most recently used city.
pub const LAST_CITY: &str = "last_city";

/// Pick the city for a request: the explicit one, then the remembered `last_city`,
/// then `default_city`. The chosen city becomes the new `last_city`.
///
/// `None` means no city is known, which callers report rather than treat as an error.
pub fn resolve_city(
    ctx: &SkillContext,
    requested: Option<&str>,
    default_city: Option<&str>,
) -> Option<String> {
    let city = requested
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| get_non_empty(ctx.memory.as_ref(), LAST_CITY))
        .or_else(|| {
            default_city
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        })?;

    debug!(%city, "resolved city");
    if let Err(err) = ctx.memory.set(LAST_CITY, &city) {
        warn!("failed to remember last city: {err:#}");
    }

    Some(city)
}
