//! Decodes raw S2 event bodies into normalized resources.
//!
//! The top-level JSON key names the model; an explicit registry maps
//! model names to decoder functions. Decoders are pure and do no I/O.


use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::common::errors::{SyncError, SyncResult};

/// Sample UUIDs per well location, as carried on the wire.
pub type SampleMap = BTreeMap<String, Vec<Uuid>>;

/// Row letters span A-Z, so a plate can never be taller than 26 rows.
const MAX_PLATE_ROWS: u32 = 26;

/// One aliquot in a well. Content is opaque beyond the optional sample
/// reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aliquot {
    pub sample: Option<Uuid>,
}

/// A grid-shaped plate. Tube racks decode into this same shape: each
/// tube maps 1:1 to a well location, so the store never needs a
/// separate tube-rack concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plate {
    pub number_of_rows: u32,
    pub number_of_columns: u32,
    /// Populated wells only; a missing location is an empty well.
    pub wells: BTreeMap<String, Vec<Aliquot>>,
}

impl Plate {
    #[must_use]
    pub fn size(&self) -> u32 {
        self.number_of_rows.saturating_mul(self.number_of_columns)
    }

    /// All grid locations in row-major order ("A1", "A2", ...),
    /// empty wells included.
    #[must_use]
    pub fn locations(&self) -> Vec<String> {
        let mut locations = Vec::with_capacity(self.size() as usize);
        for letter in (b'A'..=b'Z')
            .take(self.number_of_rows as usize)
            .map(char::from)
        {
            for column in 1..=self.number_of_columns {
                locations.push(format!("{letter}{column}"));
            }
        }
        locations
    }

    #[must_use]
    pub fn aliquots_at(&self, location: &str) -> &[Aliquot] {
        self.wells.get(location).map_or(&[], Vec::as_slice)
    }
}

/// An order item: a referenced resource and its progress status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub uuid: Uuid,
    pub status: String,
}

/// An order: named roles, each holding zero or more items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Order {
    pub items: BTreeMap<String, Vec<OrderItem>>,
}

impl Order {
    #[must_use]
    pub fn items_for(&self, role: &str) -> &[OrderItem] {
        self.items.get(role).map_or(&[], Vec::as_slice)
    }
}

/// A decoded event body, uniform across all supported models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    Plate {
        plate: Plate,
        uuid: Uuid,
        sample_uuids: SampleMap,
    },
    Order {
        order: Order,
        uuid: Uuid,
    },
}

type DecoderFn = fn(&Value) -> SyncResult<DecodedEvent>;

/// Explicit model-name to decoder table. Unknown names are rejected up
/// front instead of being resolved dynamically.
#[must_use]
pub fn decoder_for(model: &str) -> Option<DecoderFn> {
    match model {
        "plate" => Some(decode_plate),
        "tube_rack" => Some(decode_tube_rack),
        "order" => Some(decode_order),
        "plate_transfer" => Some(decode_plate_transfer),
        _ => None,
    }
}

/// Decodes a raw event body. The single top-level key selects the
/// decoder; its value is the model body.
pub fn decode(body: &[u8]) -> SyncResult<DecodedEvent> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| SyncError::MalformedEvent(format!("invalid json: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| SyncError::MalformedEvent("event body is not a json object".to_string()))?;
    let model = object
        .keys()
        .next()
        .cloned()
        .ok_or_else(|| SyncError::MalformedEvent("event body has no model key".to_string()))?;

    let decoder = decoder_for(&model).ok_or(SyncError::UnsupportedModel(model.clone()))?;
    decoder(&object[&model])
}

#[derive(Deserialize)]
struct SampleBody {
    uuid: Uuid,
}

#[derive(Deserialize)]
struct AliquotBody {
    sample: Option<SampleBody>,
}

#[derive(Deserialize)]
struct PlateBody {
    uuid: Uuid,
    number_of_rows: u32,
    number_of_columns: u32,
    #[serde(default)]
    wells: BTreeMap<String, Vec<AliquotBody>>,
}

#[derive(Deserialize)]
struct TubeBody {
    #[serde(default)]
    aliquots: Vec<AliquotBody>,
}

#[derive(Deserialize)]
struct TubeRackBody {
    uuid: Uuid,
    number_of_rows: u32,
    number_of_columns: u32,
    #[serde(default)]
    tubes: BTreeMap<String, TubeBody>,
}

#[derive(Deserialize)]
struct OrderItemBody {
    uuid: Uuid,
    status: String,
}

#[derive(Deserialize)]
struct OrderBody {
    uuid: Uuid,
    #[serde(default)]
    items: BTreeMap<String, Vec<OrderItemBody>>,
}

fn malformed(model: &str, error: &serde_json::Error) -> SyncError {
    SyncError::MalformedEvent(format!("invalid {model} body: {error}"))
}

fn decode_plate(body: &Value) -> SyncResult<DecodedEvent> {
    let plate: PlateBody =
        serde_json::from_value(body.clone()).map_err(|e| malformed("plate", &e))?;
    plate_event(
        plate.uuid,
        plate.number_of_rows,
        plate.number_of_columns,
        plate.wells,
    )
}

fn decode_tube_rack(body: &Value) -> SyncResult<DecodedEvent> {
    let rack: TubeRackBody =
        serde_json::from_value(body.clone()).map_err(|e| malformed("tube_rack", &e))?;
    let wells = rack
        .tubes
        .into_iter()
        .map(|(location, tube)| (location, tube.aliquots))
        .collect();
    plate_event(
        rack.uuid,
        rack.number_of_rows,
        rack.number_of_columns,
        wells,
    )
}

/// A transfer is modeled as the resulting plate state, so decoding
/// delegates to the plate decoder on the wrapped `result` payload.
fn decode_plate_transfer(body: &Value) -> SyncResult<DecodedEvent> {
    let result = body
        .get("result")
        .ok_or_else(|| SyncError::MalformedEvent("plate_transfer has no result".to_string()))?;
    let plate = result
        .get("plate")
        .ok_or_else(|| SyncError::MalformedEvent("transfer result has no plate".to_string()))?;
    decode_plate(plate)
}

fn decode_order(body: &Value) -> SyncResult<DecodedEvent> {
    let order: OrderBody =
        serde_json::from_value(body.clone()).map_err(|e| malformed("order", &e))?;
    let items = order
        .items
        .into_iter()
        .map(|(role, items)| {
            let items = items
                .into_iter()
                .map(|item| OrderItem {
                    uuid: item.uuid,
                    status: item.status,
                })
                .collect();
            (role, items)
        })
        .collect();
    Ok(DecodedEvent::Order {
        order: Order { items },
        uuid: order.uuid,
    })
}

fn plate_event(
    uuid: Uuid,
    number_of_rows: u32,
    number_of_columns: u32,
    wells: BTreeMap<String, Vec<AliquotBody>>,
) -> SyncResult<DecodedEvent> {
    if number_of_rows == 0 || number_of_rows > MAX_PLATE_ROWS {
        return Err(SyncError::MalformedEvent(format!(
            "number_of_rows {number_of_rows} is out of range (1-{MAX_PLATE_ROWS})"
        )));
    }
    if number_of_columns == 0 || number_of_rows.checked_mul(number_of_columns).is_none() {
        return Err(SyncError::MalformedEvent(format!(
            "{number_of_rows}x{number_of_columns} is not a usable plate size"
        )));
    }

    let mut sample_uuids = SampleMap::new();
    let mut decoded_wells = BTreeMap::new();

    for (location, aliquots) in wells {
        // An absent key and an empty list are the same thing: an empty well.
        if aliquots.is_empty() {
            continue;
        }
        let samples: Vec<Uuid> = aliquots
            .iter()
            .filter_map(|aliquot| aliquot.sample.as_ref().map(|sample| sample.uuid))
            .collect();
        if !samples.is_empty() {
            sample_uuids.insert(location.clone(), samples);
        }
        let aliquots = aliquots
            .into_iter()
            .map(|aliquot| Aliquot {
                sample: aliquot.sample.map(|sample| sample.uuid),
            })
            .collect();
        decoded_wells.insert(location, aliquots);
    }

    Ok(DecodedEvent::Plate {
        plate: Plate {
            number_of_rows,
            number_of_columns,
            wells: decoded_wells,
        },
        uuid,
        sample_uuids,
    })
}
