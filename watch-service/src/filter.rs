use postwatch_core::{KeywordSet, Post};

/// Keeps posts whose title contains one of the keywords, ignoring case.
/// With no keywords configured every post passes.
pub fn filter_keywords<'a, I>(posts: I, keywords: &KeywordSet) -> Vec<&'a Post>
where
    I: IntoIterator<Item = &'a Post>,
{
    posts
        .into_iter()
        .filter(|post| keywords.is_empty() || keywords.matches(&post.title))
        .collect()
}
