use axum::{extract::Path, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

use crate::{
    auth::AuthenticatedAdmin,
    registry::Source,
    services::schemas::{all_schemas, example_config, schema_for, SourceSchema},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    #[serde(flatten)]
    pub schema: SourceSchema,
    pub example: Value,
}

impl From<SourceSchema> for SchemaResponse {
    fn from(schema: SourceSchema) -> Self {
        let example = example_config(&schema);
        Self { schema, example }
    }
}

pub async fn list_schemas(_admin: AuthenticatedAdmin) -> Json<Vec<SchemaResponse>> {
    Json(all_schemas().into_iter().map(SchemaResponse::from).collect())
}

pub async fn get_schema(
    _admin: AuthenticatedAdmin,
    Path(source): Path<String>,
) -> Result<Json<SchemaResponse>, (StatusCode, String)> {
    let source = Source::from_tag(&source)
        .ok_or((StatusCode::NOT_FOUND, format!("Unknown source {source}")))?;
    Ok(Json(schema_for(source).into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_response_flattens_fields() {
        let value = serde_json::to_value(SchemaResponse::from(schema_for(Source::ExchangeRate))).unwrap();
        assert_eq!(value["source"], "EXCHANGE_RATE");
        assert_eq!(value["required"][0], "currencyCode");
        assert_eq!(value["types"]["days"], "integer");
        assert_eq!(value["example"]["currencyCode"], "");
    }
}
