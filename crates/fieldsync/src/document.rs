//! Core document types for fieldsync.
//!
//! A [`Document`] wraps one field record (a GPS photo, a MILDA net
//! distribution or a medicine distribution) with the metadata the sync engine
//! needs: a stable id, the creation time and the synced flag.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Length of the random suffix appended to generated ids.
const ID_SUFFIX_LEN: usize = 12;

/// The kind of record a document carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    /// Geotagged photo of a household or property.
    GpsPhoto,
    /// Long-lasting insecticidal net (MILDA) distribution.
    Milda,
    /// Medicine distribution.
    Medicine,
}

impl TypeTag {
    /// The collection documents of this type are stored in.
    #[must_use]
    pub fn collection(self) -> Collection {
        match self {
            Self::GpsPhoto => Collection::GpsPhotos,
            Self::Milda | Self::Medicine => Collection::Distributions,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpsPhoto => write!(f, "gps_photo"),
            Self::Milda => write!(f, "milda"),
            Self::Medicine => write!(f, "medicine"),
        }
    }
}

/// A named, independently persisted sequence of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// MILDA and medicine distributions.
    Distributions,
    /// GPS photos.
    GpsPhotos,
}

impl Collection {
    /// Every collection, in sync order.
    pub const ALL: [Collection; 2] = [Collection::Distributions, Collection::GpsPhotos];

    /// The fixed key the collection is persisted under.
    #[must_use]
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Distributions => "omvs_distributions",
            Self::GpsPhotos => "omvs_gps_photos",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Distributions => write!(f, "distributions"),
            Self::GpsPhotos => write!(f, "gps_photos"),
        }
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distributions" | "omvs_distributions" => Ok(Self::Distributions),
            "gps_photos" | "gps-photos" | "omvs_gps_photos" => Ok(Self::GpsPhotos),
            other => Err(format!("unknown collection: {other}")),
        }
    }
}

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// Administrative location picked from the location hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLocation {
    /// Country (pays).
    pub country: String,
    /// Region.
    pub region: String,
    /// Department (moughataa).
    pub moughataa: String,
    /// Commune.
    pub commune: String,
}

/// A geotagged photo record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsPhoto {
    /// Where the photo was taken.
    pub location: GeoPoint,
    /// Administrative location selected by the collector.
    pub admin_location: AdminLocation,
    /// Photo URI or encoded image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A MILDA net distribution to one household.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MildaDistribution {
    /// Head of household.
    pub household_head: String,
    /// Number of nets handed out.
    pub net_count: u32,
    /// National identification number (NNI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    /// Phone number or other contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    /// Distribution centre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_center: Option<String>,
    /// Name of the distributor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributor: Option<String>,
    /// Date as entered on the form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_date: Option<String>,
    /// Photo of the distribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// GPS photo captured before the distribution form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_photo: Option<GpsPhoto>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A medicine distribution to one household.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineDistribution {
    /// Head of household.
    pub household_head: String,
    /// Medicine handed out.
    pub medicine_type: String,
    /// Quantity handed out.
    pub quantity: u32,
    /// National identification number (NNI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    /// Phone number or other contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    /// Distribution centre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_center: Option<String>,
    /// Name of the distributor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributor: Option<String>,
    /// Date as entered on the form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_date: Option<String>,
    /// Photo of the distribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// GPS photo captured before the distribution form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_photo: Option<GpsPhoto>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Record-specific fields, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Payload {
    /// A GPS photo.
    GpsPhoto(GpsPhoto),
    /// A MILDA distribution.
    Milda(MildaDistribution),
    /// A medicine distribution.
    Medicine(MedicineDistribution),
}

impl Payload {
    /// The type tag matching this payload.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::GpsPhoto(_) => TypeTag::GpsPhoto,
            Self::Milda(_) => TypeTag::Milda,
            Self::Medicine(_) => TypeTag::Medicine,
        }
    }
}

/// The payloads accepted by the `Distributions` collection.
#[derive(Debug, Clone, PartialEq)]
pub enum DistributionPayload {
    /// A MILDA distribution.
    Milda(MildaDistribution),
    /// A medicine distribution.
    Medicine(MedicineDistribution),
}

impl From<DistributionPayload> for Payload {
    fn from(payload: DistributionPayload) -> Self {
        match payload {
            DistributionPayload::Milda(milda) => Self::Milda(milda),
            DistributionPayload::Medicine(medicine) => Self::Medicine(medicine),
        }
    }
}

impl From<MildaDistribution> for DistributionPayload {
    fn from(milda: MildaDistribution) -> Self {
        Self::Milda(milda)
    }
}

impl From<MedicineDistribution> for DistributionPayload {
    fn from(medicine: MedicineDistribution) -> Self {
        Self::Medicine(medicine)
    }
}

impl From<GpsPhoto> for Payload {
    fn from(photo: GpsPhoto) -> Self {
        Self::GpsPhoto(photo)
    }
}

/// One stored record.
///
/// `id` and `created_at` are fixed at creation. `synced` only ever moves from
/// `false` to `true`, through [`Document::mark_synced`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    id: String,
    created_at: DateTime<Utc>,
    synced: bool,
    #[serde(flatten)]
    payload: Payload,
}

impl Document {
    /// Create a new, unsynced document with a freshly generated id.
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        let created_at = Utc::now();
        let id = Self::generate_id(payload.type_tag(), created_at);
        Self {
            id,
            created_at,
            synced: false,
            payload,
        }
    }

    /// Generate an id of the form `{type}_{unix millis}_{random}`.
    #[must_use]
    pub fn generate_id(tag: TypeTag, at: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{tag}_{}_{}",
            at.timestamp_millis(),
            &suffix[..ID_SUFFIX_LEN]
        )
    }

    /// The document id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the document was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the document has been accepted by the remote store.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Record a successful push. There is no way back to unsynced.
    pub fn mark_synced(&mut self) {
        self.synced = true;
    }

    /// The record-specific fields.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The kind of record.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        self.payload.type_tag()
    }

    /// The collection this document belongs in.
    #[must_use]
    pub fn collection(&self) -> Collection {
        self.type_tag().collection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_gps_photo() -> GpsPhoto {
        GpsPhoto {
            location: GeoPoint {
                latitude: 16.5138,
                longitude: -15.8051,
            },
            admin_location: AdminLocation {
                country: "Mauritanie".to_string(),
                region: "Trarza".to_string(),
                moughataa: "Rosso".to_string(),
                commune: "Rosso".to_string(),
            },
            photo: Some("file:///photos/house-12.jpg".to_string()),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_type_tag_display() {
        assert_eq!(TypeTag::GpsPhoto.to_string(), "gps_photo");
        assert_eq!(TypeTag::Milda.to_string(), "milda");
        assert_eq!(TypeTag::Medicine.to_string(), "medicine");
    }

    #[test]
    fn test_type_tag_collection() {
        assert_eq!(TypeTag::GpsPhoto.collection(), Collection::GpsPhotos);
        assert_eq!(TypeTag::Milda.collection(), Collection::Distributions);
        assert_eq!(TypeTag::Medicine.collection(), Collection::Distributions);
    }

    #[test]
    fn test_collection_keys() {
        assert_eq!(Collection::Distributions.storage_key(), "omvs_distributions");
        assert_eq!(Collection::GpsPhotos.storage_key(), "omvs_gps_photos");
    }

    #[test]
    fn test_collection_from_str() {
        assert_eq!(
            "distributions".parse::<Collection>(),
            Ok(Collection::Distributions)
        );
        assert_eq!("gps-photos".parse::<Collection>(), Ok(Collection::GpsPhotos));
        assert!("photos".parse::<Collection>().is_err());
    }

    #[test]
    fn test_new_document_is_unsynced() {
        let doc = Document::new(sample_gps_photo().into());

        assert!(!doc.is_synced());
        assert_eq!(doc.type_tag(), TypeTag::GpsPhoto);
        assert_eq!(doc.collection(), Collection::GpsPhotos);
        assert!(doc.id().starts_with("gps_photo_"));
    }

    #[test]
    fn test_generated_id_shape() {
        let at = Utc::now();
        let id = Document::generate_id(TypeTag::Milda, at);
        let rest = id.strip_prefix("milda_").unwrap();
        let (millis, suffix) = rest.split_once('_').unwrap();

        assert_eq!(millis, at.timestamp_millis().to_string());
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
    }

    #[test]
    fn test_generated_ids_differ_within_same_millisecond() {
        let at = Utc::now();
        let a = Document::generate_id(TypeTag::Medicine, at);
        let b = Document::generate_id(TypeTag::Medicine, at);
        assert_ne!(a, b);
    }

    #[test]
    fn test_mark_synced_is_monotonic() {
        let mut doc = Document::new(sample_gps_photo().into());
        doc.mark_synced();
        doc.mark_synced();
        assert!(doc.is_synced());
    }

    #[test]
    fn test_serialized_shape() {
        let milda = MildaDistribution {
            household_head: "Aminata Ba".to_string(),
            net_count: 3,
            ..MildaDistribution::default()
        };
        let doc = Document::new(Payload::Milda(milda));
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["type"], "milda");
        assert_eq!(value["synced"], false);
        assert_eq!(value["id"], doc.id());
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["payload"]["householdHead"], "Aminata Ba");
        assert_eq!(value["payload"]["netCount"], 3);
        assert!(value["payload"].get("nationalId").is_none());
    }

    #[test]
    fn test_unknown_payload_fields_survive() {
        let json = r#"{
            "id": "medicine_1718000000000_abcdef012345",
            "createdAt": "2024-06-10T06:13:20Z",
            "synced": false,
            "type": "medicine",
            "payload": {
                "householdHead": "Moussa Diallo",
                "medicineType": "SP",
                "quantity": 2,
                "batchNumber": "LOT-778"
            }
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();

        let Payload::Medicine(medicine) = doc.payload() else {
            panic!("expected a medicine payload");
        };
        assert_eq!(medicine.quantity, 2);
        assert_eq!(medicine.extra["batchNumber"], "LOT-778");

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["payload"]["batchNumber"], "LOT-778");
    }

    #[test]
    fn test_distribution_payload_conversion() {
        let payload: Payload = DistributionPayload::from(MedicineDistribution::default()).into();
        assert_eq!(payload.type_tag(), TypeTag::Medicine);
    }
}
