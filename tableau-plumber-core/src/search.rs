//! Name lookup over enumerated items.
//!
//! The server does not keep display names unique. Lookups return the first
//! item in enumeration order whose name matches exactly; later items with the
//! same name are never reachable by name.

use tracing::info;

use crate::contract::ServerClient;
use crate::error::PlumberError;
use crate::items::{ItemType, RemoteItem, RequestOptions};
use crate::query::list_items;
use crate::session::Session;

/// First item whose display name equals `name` exactly.
pub fn first_named<'a, I>(items: I, name: &str) -> Option<I::Item>
where
    I: IntoIterator<Item = &'a RemoteItem>,
{
    items.into_iter().find(|item| item.name() == name)
}

/// Finds an item of the given type by exact name.
///
/// `options` defaults to the session's owner filter; projects are always
/// listed unfiltered. Returns `Ok(None)` for an empty `name`, an unknown tag,
/// or no match.
pub async fn find_item<C: ServerClient>(
    session: &Session<C>,
    tag: &str,
    name: &str,
    options: Option<&RequestOptions>,
) -> Result<Option<RemoteItem>, PlumberError> {
    if name.is_empty() {
        return Ok(None);
    }
    let Some(item_type) = ItemType::from_tag(tag) else {
        return Ok(None);
    };
    find_typed(session, item_type, name, options).await
}

/// [`find_item`] for an already-parsed item type.
pub async fn find_typed<C: ServerClient>(
    session: &Session<C>,
    item_type: ItemType,
    name: &str,
    options: Option<&RequestOptions>,
) -> Result<Option<RemoteItem>, PlumberError> {
    if name.is_empty() {
        return Ok(None);
    }
    let options = options.unwrap_or(session.default_options());
    let items = session
        .scoped(list_items(session.client(), item_type, options))
        .await?;

    info!(
        search = %name.to_uppercase(),
        item_type = %item_type.as_str().to_uppercase(),
        candidates = items.len(),
        "Checking items"
    );
    Ok(first_named(&items, name).cloned())
}
