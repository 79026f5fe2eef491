/// A water meter and the client it is registered to.
///
/// Backed by the `datos_medidor` table. Only `meter_id` and `client_name`
/// are guaranteed; address and sector are free-text and may be missing.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Meter {
    pub meter_id: i64,
    pub client_name: String,
    pub address: Option<String>,
    pub sector: Option<String>,
}
