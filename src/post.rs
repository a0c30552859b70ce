use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Quality used for resized CMS images.
const IMAGE_QUALITY: u8 = 75;

/// Non-empty post identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Slug {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            Err("slug must not be empty".to_string())
        } else {
            Ok(Slug(value))
        }
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A CMS entry. Only the slug is guaranteed: unfinished drafts served in
/// preview mode can leave any other field null.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub slug: Slug,
    pub title: Option<String>,
    pub cover_image: Option<Image>,
    pub date: Option<String>,
    pub author: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<Content>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
}

impl Image {
    pub fn sized_url(&self, width: u32) -> String {
        sized_url(&self.url, width)
    }
}

/// Rich-text body plus the assets it embeds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub json: Value,
    #[serde(default)]
    pub links: Option<ContentLinks>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentLinks {
    #[serde(default)]
    pub assets: AssetLinks,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetLinks {
    #[serde(default)]
    pub block: Vec<Asset>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub sys: Sys,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl Asset {
    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn sized_url(&self, width: u32) -> Option<String> {
        self.url.as_deref().map(|url| sized_url(url, width))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sys {
    pub id: String,
}

impl Content {
    pub fn assets(&self) -> &[Asset] {
        self.links
            .as_ref()
            .map(|links| links.assets.block.as_slice())
            .unwrap_or(&[])
    }

    /// Looks up an embedded asset by id in the linked asset table.
    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets().iter().find(|asset| asset.id() == id)
    }

    /// Ids of `embedded-asset-block` nodes, in document order.
    pub fn embedded_asset_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        collect_embedded_assets(&self.json, &mut ids);
        ids
    }

    /// Embedded asset ids with no matching entry in the asset table.
    pub fn unresolved_asset_ids(&self) -> Vec<&str> {
        self.embedded_asset_ids()
            .into_iter()
            .filter(|id| self.asset(id).is_none())
            .collect()
    }
}

fn collect_embedded_assets<'a>(node: &'a Value, ids: &mut Vec<&'a str>) {
    if node.get("nodeType").and_then(Value::as_str) == Some("embedded-asset-block") {
        if let Some(id) = node.pointer("/data/target/sys/id").and_then(Value::as_str) {
            ids.push(id);
        }
    }
    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            collect_embedded_assets(child, ids);
        }
    }
}

fn sized_url(url: &str, width: u32) -> String {
    format!("{}?w={}&q={}", url, width, IMAGE_QUALITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_post() -> Value {
        json!({
            "slug": "hello-world",
            "title": "Hello",
            "coverImage": { "url": "https://images.ctfassets.net/cover.png" },
            "date": "2024-03-01T00:00:00.000Z",
            "author": null,
            "excerpt": "First post",
            "content": {
                "json": {
                    "nodeType": "document",
                    "content": [
                        { "nodeType": "paragraph", "content": [] },
                        {
                            "nodeType": "embedded-asset-block",
                            "data": { "target": { "sys": { "id": "img-1" } } },
                            "content": []
                        },
                        {
                            "nodeType": "embedded-asset-block",
                            "data": { "target": { "sys": { "id": "img-2" } } },
                            "content": []
                        }
                    ]
                },
                "links": {
                    "assets": {
                        "block": [{
                            "sys": { "id": "img-1" },
                            "url": "https://images.ctfassets.net/one.png",
                            "description": "One"
                        }]
                    }
                }
            }
        })
    }

    #[test]
    fn parses_cms_record() {
        let post: Post = serde_json::from_value(sample_post()).unwrap();

        assert_eq!(post.slug.as_str(), "hello-world");
        assert_eq!(post.author, None);
        assert_eq!(post.excerpt.as_deref(), Some("First post"));
        assert_eq!(
            post.cover_image.unwrap().sized_url(640),
            "https://images.ctfassets.net/cover.png?w=640&q=75"
        );
    }

    #[test]
    fn accepts_unfinished_draft() {
        let post: Post = serde_json::from_value(json!({
            "slug": "draft",
            "title": null,
            "date": null
        }))
        .unwrap();

        assert_eq!(post.slug.as_str(), "draft");
        assert!(post.title.is_none() && post.date.is_none());
        assert!(post.content.is_none());
    }

    #[test]
    fn rejects_empty_slug() {
        let mut raw = sample_post();
        raw["slug"] = json!("");
        assert!(serde_json::from_value::<Post>(raw).is_err());
    }

    #[test]
    fn resolves_embedded_assets() {
        let post: Post = serde_json::from_value(sample_post()).unwrap();
        let content = post.content.unwrap();

        assert_eq!(content.embedded_asset_ids(), vec!["img-1", "img-2"]);
        assert_eq!(content.asset("img-1").and_then(|a| a.description.as_deref()), Some("One"));
        assert_eq!(content.unresolved_asset_ids(), vec!["img-2"]);
    }

    #[test]
    fn content_without_links_has_no_assets() {
        let content: Content = serde_json::from_value(json!({ "json": {} })).unwrap();
        assert!(content.assets().is_empty());
        assert!(content.asset("img-1").is_none());
    }
}
