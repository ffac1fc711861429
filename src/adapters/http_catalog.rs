use crate::core::{CatalogClient, CatalogProduct, Category, ConfigProvider, Price, ProductId};
use crate::utils::error::{CartError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

/// Catalog client for the storefront's Express API.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base: Url,
}

impl HttpCatalogClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_client(endpoint, Client::new())
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(endpoint, client)
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::with_timeout(config.catalog_endpoint(), config.request_timeout())
    }

    fn with_client(endpoint: &str, client: Client) -> Result<Self> {
        let base = Url::parse(endpoint)?;
        if base.cannot_be_a_base() {
            return Err(CartError::ConfigError {
                message: format!("catalog endpoint '{}' cannot take a path", endpoint),
            });
        }
        Ok(Self { client, base })
    }

    fn url_for(&self, resource: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CartError::ConfigError {
                message: format!("catalog endpoint '{}' cannot take a path", self.base),
            })?
            .pop_if_empty()
            .push(resource);
        Ok(url)
    }

    async fn get_json(&self, url: Url, query: &[(&str, String)]) -> Result<(StatusCode, Value)> {
        tracing::debug!("GET {} {:?}", url, query);
        let response = self.client.get(url.clone()).query(query).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok((status, Value::Null));
        }
        if !status.is_success() {
            return Err(CartError::CatalogStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.json::<Value>().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn product(&self, id: ProductId) -> Result<CatalogProduct> {
        let url = self.url_for("products")?;
        let (status, body) = self.get_json(url, &[("pid", id.to_string())]).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(CartError::ProductNotFound { id: id.get() });
        }

        let product = parse_product(&body, id.get())?;
        if product.id != id {
            return Err(CartError::MalformedProduct {
                id: id.get(),
                reason: format!("catalog answered with product {}", product.id),
            });
        }
        Ok(product)
    }

    async fn products(&self, category_id: Option<u64>) -> Result<Vec<CatalogProduct>> {
        let url = self.url_for("products")?;
        let query: Vec<(&str, String)> = category_id
            .map(|catid| vec![("catid", catid.to_string())])
            .unwrap_or_default();
        let (status, body) = self.get_json(url.clone(), &query).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(CartError::CatalogStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let Value::Array(items) = body else {
            return Err(CartError::MalformedProduct {
                id: 0,
                reason: "product listing is not a JSON array".to_string(),
            });
        };

        let mut products = Vec::with_capacity(items.len());
        for item in &items {
            match parse_product(item, 0) {
                Ok(product) => products.push(product),
                Err(e) => tracing::warn!("Skipping catalog entry: {}", e),
            }
        }
        Ok(products)
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let url = self.url_for("categories")?;
        let (status, body) = self.get_json(url.clone(), &[]).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(CartError::CatalogStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(serde_json::from_value(body)?)
    }
}

/// Validates one product object. `requested` only labels the error.
pub fn parse_product(value: &Value, requested: u64) -> Result<CatalogProduct> {
    let malformed = |reason: &str| CartError::MalformedProduct {
        id: requested,
        reason: reason.to_string(),
    };
    let object = value
        .as_object()
        .ok_or_else(|| malformed("expected a JSON object"))?;

    let raw_id = object
        .get("pid")
        .or_else(|| object.get("id"))
        .and_then(as_u64_lenient)
        .ok_or_else(|| malformed("missing product id"))?;
    let id = ProductId::new(raw_id).map_err(|_| malformed("product id must be positive"))?;

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| malformed("missing product name"))?
        .to_string();

    let price = object
        .get("price")
        .and_then(as_price)
        .ok_or_else(|| malformed("price is not a non-negative number"))?;

    let available = match object.get("available") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => other.as_u64().map(|n| n != 0).unwrap_or(true),
    };

    Ok(CatalogProduct {
        id,
        name,
        price,
        category_id: object
            .get("catid")
            .or_else(|| object.get("categoryId"))
            .and_then(as_u64_lenient),
        description: string_field(object, &["description"]),
        thumbnail_path: string_field(object, &["thumbnail_path", "thumbnailPath"]),
        image_path: string_field(object, &["image_path", "imagePath"]),
        available,
    })
}

fn as_u64_lenient(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_price(value: &Value) -> Option<Price> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(whole) => whole.checked_mul(100).map(Price::from_cents),
            None => n.as_f64().and_then(Price::from_f64),
        },
        Value::String(s) => Price::parse(s),
        _ => None,
    }
}

/// First non-empty string among `keys`.
fn string_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn pid(raw: u64) -> ProductId {
        ProductId::new(raw).unwrap()
    }

    #[test]
    fn parses_sql_style_product() {
        let product = parse_product(
            &json!({
                "pid": 5, "catid": 2, "name": "Teapot", "price": "12.50",
                "description": "Cast iron", "image_path": "uploads/5.jpg",
                "thumbnail_path": "uploads/thumb_5.jpg"
            }),
            5,
        )
        .unwrap();

        assert_eq!(product.id, pid(5));
        assert_eq!(product.price, Price::from_cents(1250));
        assert_eq!(product.category_id, Some(2));
        assert!(product.available);
        assert_eq!(product.display_image(), "uploads/thumb_5.jpg");

        let camel = parse_product(
            &json!({
                "id": 5, "categoryId": 2, "name": "Teapot", "price": 12.5,
                "thumbnailPath": "uploads/t5.jpg", "imagePath": "uploads/5.jpg"
            }),
            5,
        )
        .unwrap();

        assert_eq!(camel.thumbnail_path.as_deref(), Some("uploads/t5.jpg"));
        assert_eq!(camel.image_path.as_deref(), Some("uploads/5.jpg"));
        assert_eq!(camel.category_id, Some(2));
        assert_eq!(camel.display_image(), "uploads/t5.jpg");

        let image_only =
            parse_product(&json!({"id": 6, "name": "Cup", "price": 1, "imagePath": "uploads/6.jpg"}), 6)
                .unwrap();
        assert_eq!(image_only.display_image(), "uploads/6.jpg");
    }

    #[test]
    fn rejects_malformed_products() {
        let cases = [
            json!({"name": "No id", "price": 1}),
            json!({"pid": 1, "price": 1}),
            json!({"pid": 1, "name": "", "price": 1}),
            json!({"pid": 1, "name": "Bad price", "price": "abc"}),
            json!({"pid": 1, "name": "Negative", "price": -3.5}),
            json!({"pid": 0, "name": "Zero", "price": 1}),
            json!(["not", "an", "object"]),
        ];
        for case in &cases {
            assert!(
                matches!(parse_product(case, 1), Err(CartError::MalformedProduct { .. })),
                "accepted {case}"
            );
        }
    }

    #[test]
    fn availability_flag_is_optional() {
        let hidden = parse_product(
            &json!({"pid": 1, "name": "Hidden", "price": 2.0, "available": false}),
            1,
        )
        .unwrap();
        assert!(!hidden.available);

        let tinyint = parse_product(
            &json!({"pid": 1, "name": "Hidden", "price": 2, "available": 0}),
            1,
        )
        .unwrap();
        assert!(!tinyint.available);
        assert_eq!(tinyint.price, Price::from_cents(200));
    }

    #[tokio::test]
    async fn product_lookup_uses_pid_query() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/products").query_param("pid", "7");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"pid": 7, "name": "Mug", "price": "9.99"}));
        });

        let client = HttpCatalogClient::new(&server.base_url()).unwrap();
        let product = client.product(pid(7)).await.unwrap();

        api_mock.assert();
        assert_eq!(product.name, "Mug");
        assert_eq!(product.price, Price::from_cents(999));
    }

    #[tokio::test]
    async fn missing_product_maps_to_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/products").query_param("pid", "404");
            then.status(404)
                .header("Content-Type", "application/json")
                .json_body(json!({"error": "Product not found"}));
        });

        let client = HttpCatalogClient::new(&server.base_url()).unwrap();
        let err = client.product(pid(404)).await.unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound { id: 404 }));
    }

    #[tokio::test]
    async fn server_error_and_id_mismatch_are_failures() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/products").query_param("pid", "1");
            then.status(500);
        });
        server.mock(|when, then| {
            when.method(GET).path("/products").query_param("pid", "2");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"pid": 3, "name": "Other", "price": 1}));
        });

        let client = HttpCatalogClient::new(&server.base_url()).unwrap();
        assert!(matches!(
            client.product(pid(1)).await,
            Err(CartError::CatalogStatusError { status: 500, .. })
        ));
        assert!(matches!(
            client.product(pid(2)).await,
            Err(CartError::MalformedProduct { id: 2, .. })
        ));
    }

    #[tokio::test]
    async fn lists_products_by_category_and_skips_bad_rows() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/products").query_param("catid", "2");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!([
                    {"pid": 1, "catid": 2, "name": "Kettle", "price": "30.00"},
                    {"pid": 2, "catid": 2, "price": "1.00"}
                ]));
        });

        let client = HttpCatalogClient::new(&server.base_url()).unwrap();
        let products = client.products(Some(2)).await.unwrap();

        api_mock.assert();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Kettle");
    }

    #[tokio::test]
    async fn lists_categories_under_a_path_prefix() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/api/categories");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!([{"catid": 1, "name": "Kitchen"}, {"catid": 2, "name": "Tea"}]));
        });

        let client = HttpCatalogClient::new(&server.url("/api/")).unwrap();
        let categories = client.categories().await.unwrap();

        api_mock.assert();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[1].name, "Tea");
    }
}
