use postwatch_core::{FirstRunPolicy, Marker, Post};
use tracing::warn;

/// Returns the posts newer than `marker`.
///
/// `posts` must be in chronological order (oldest first). When the marker is
/// still in the feed everything after it is new. When it has dropped out of
/// the feed window, numeric thread ids decide; if the ids are not numeric
/// the whole window is newer than the marker. Without a marker `policy`
/// decides.
pub fn detect_new<'a>(
    posts: &'a [Post],
    marker: Option<&Marker>,
    policy: FirstRunPolicy,
) -> Vec<&'a Post> {
    let Some(marker) = marker else {
        return match policy {
            FirstRunPolicy::MarkSeen => Vec::new(),
            FirstRunPolicy::NotifyAll => posts.iter().collect(),
        };
    };

    if let Some(position) = posts.iter().position(|post| marker.matches(post)) {
        return posts[position + 1..].iter().collect();
    }

    let numeric_ids: Option<Vec<u64>> = posts.iter().map(|post| post.id.parse().ok()).collect();
    match (marker.as_str().parse::<u64>(), numeric_ids) {
        (Ok(marker_id), Some(ids)) => posts
            .iter()
            .zip(ids)
            .filter(|(_, id)| *id > marker_id)
            .map(|(post, _)| post)
            .collect(),
        _ => {
            if !posts.is_empty() {
                warn!(
                    "Marker {} is no longer in the feed, treating all {} posts as new",
                    marker,
                    posts.len()
                );
            }
            posts.iter().collect()
        }
    }
}

/// Marker to persist after a run: the newest post processed, or the current
/// marker when nothing new arrived.
pub fn next_marker(posts: &[Post], current: Option<&Marker>, new_posts: &[&Post]) -> Option<Marker> {
    match (current, new_posts.last(), posts.last()) {
        (None, _, Some(newest)) => Some(Marker::new(newest.id.as_str())),
        (Some(_), Some(newest), _) => Some(Marker::new(newest.id.as_str())),
        (current, _, _) => current.cloned(),
    }
}
