use serde::Serialize;

use crate::coordinator::FetchCoordinator;
use crate::error::Result;
use crate::extract::{extract_many, extract_one};
use crate::post::Post;

const POST_FIELDS: &str = "
    slug
    title
    coverImage {
      url
    }
    date
    author
    excerpt
    content {
      json
      links {
        assets {
          block {
            sys {
              id
            }
            url
            description
          }
        }
      }
    }
";

/// The query shapes the blog needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostQuery<'a> {
    /// Exact slug match, limit 1.
    BySlug { slug: &'a str, preview: bool },
    /// Upstream default order, limit 10.
    All { preview: bool },
    /// Everything but `slug`, newest first, limit 2.
    Excluding { slug: &'a str, preview: bool },
}

impl PostQuery<'_> {
    pub fn preview(&self) -> bool {
        match self {
            PostQuery::BySlug { preview, .. }
            | PostQuery::All { preview }
            | PostQuery::Excluding { preview, .. } => *preview,
        }
    }

    pub fn to_graphql(&self, collection: &str) -> String {
        let arguments = match self {
            PostQuery::BySlug { slug, preview } => format!(
                "where: {{ slug: {} }}, preview: {}, limit: 1",
                string_literal(slug),
                preview
            ),
            PostQuery::All { preview } => format!("preview: {}, limit: 10", preview),
            PostQuery::Excluding { slug, preview } => format!(
                "where: {{ slug_not_in: [{}] }}, order: date_DESC, preview: {}, limit: 2",
                string_literal(slug),
                preview
            ),
        };

        format!(
            "query {{\n  {}({}) {{\n    items {{{}}}\n  }}\n}}",
            collection, arguments, POST_FIELDS
        )
    }
}

/// Quotes `value` as a GraphQL string literal.
fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostAndMorePosts {
    pub post: Option<Post>,
    pub more_posts: Vec<Post>,
}

/// Read-side API over the CMS collection.
#[derive(Clone)]
pub struct PostStore {
    coordinator: FetchCoordinator,
    collection: String,
}

impl PostStore {
    pub fn new(coordinator: FetchCoordinator, collection: impl Into<String>) -> Self {
        PostStore {
            coordinator,
            collection: collection.into(),
        }
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }

    async fn one(&self, query: PostQuery<'_>) -> Result<Option<Post>> {
        let response = self
            .coordinator
            .fetch(&query.to_graphql(&self.collection), query.preview())
            .await?;
        extract_one(&response, &self.collection)
    }

    async fn many(&self, query: PostQuery<'_>) -> Result<Vec<Post>> {
        let response = self
            .coordinator
            .fetch(&query.to_graphql(&self.collection), query.preview())
            .await?;
        extract_many(&response, &self.collection)
    }

    /// Draft lookup used by preview pages; always hits preview content.
    pub async fn get_preview_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        self.one(PostQuery::BySlug { slug, preview: true }).await
    }

    pub async fn get_all_posts(&self, draft: bool) -> Result<Vec<Post>> {
        self.many(PostQuery::All { preview: draft }).await
    }

    /// Fetches a post and up to two others concurrently. Each half degrades
    /// to empty on its own failure instead of failing the whole page.
    pub async fn get_post_and_more_posts(&self, slug: &str, preview: bool) -> PostAndMorePosts {
        let (post, more_posts) = tokio::join!(
            self.one(PostQuery::BySlug { slug, preview }),
            self.many(PostQuery::Excluding { slug, preview }),
        );

        let post = post.unwrap_or_else(|err| {
            tracing::warn!(slug, error = %err, "post lookup failed, rendering without it");
            None
        });
        let more_posts = more_posts.unwrap_or_else(|err| {
            tracing::warn!(slug, error = %err, "related posts lookup failed, rendering without them");
            Vec::new()
        });

        PostAndMorePosts { post, more_posts }
    }
}
