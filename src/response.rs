//! Normalization of the edit service's success payload.
//!
//! The service has been seen to answer in several envelopes. Each known
//! envelope is a strict schema, tried in a fixed priority order; the first
//! one that deserializes (with a non-empty image list, where there is a
//! list) yields the image reference.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Which envelope the image reference was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{ "data": { "images": [ { "url": … } ] } }`
    DataImages,
    /// `{ "images": [ { "url": … } ] }`
    Images,
    /// `{ "data": { "image": … } }`
    DataImage,
    /// `{ "image": … }`
    Image,
}

/// Image reference pulled out of a success payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultImage {
    pub url: String,
    pub shape: ResponseShape,
}

#[derive(Deserialize)]
struct ImageEntry {
    url: String,
}

/// A single image is either a bare URL string or an object with `url`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImageField {
    Url(String),
    Entry(ImageEntry),
}

impl ImageField {
    fn into_url(self) -> String {
        match self {
            Self::Url(url) => url,
            Self::Entry(entry) => entry.url,
        }
    }
}

#[derive(Deserialize)]
struct ImagesEnvelope {
    images: Vec<ImageEntry>,
}

#[derive(Deserialize)]
struct ImageEnvelope {
    image: ImageField,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

fn decode<T: DeserializeOwned>(payload: &Value) -> Option<T> {
    T::deserialize(payload).ok()
}

fn first_url(images: Vec<ImageEntry>) -> Option<String> {
    images.into_iter().next().map(|e| e.url)
}

type Decoder = fn(&Value) -> Option<String>;

/// Known envelopes in priority order.
const DECODERS: &[(ResponseShape, Decoder)] = &[
    (ResponseShape::DataImages, |v| {
        decode::<DataEnvelope<ImagesEnvelope>>(v).and_then(|e| first_url(e.data.images))
    }),
    (ResponseShape::Images, |v| {
        decode::<ImagesEnvelope>(v).and_then(|e| first_url(e.images))
    }),
    (ResponseShape::DataImage, |v| {
        decode::<DataEnvelope<ImageEnvelope>>(v).map(|e| e.data.image.into_url())
    }),
    (ResponseShape::Image, |v| {
        decode::<ImageEnvelope>(v).map(|e| e.image.into_url())
    }),
];

/// Find the result image in a success payload. `None` means no known
/// envelope matched.
pub fn extract_image(payload: &Value) -> Option<ResultImage> {
    // serde would also accept a struct in sequence form
    if !payload.is_object() {
        return None;
    }
    DECODERS.iter().find_map(|(shape, decoder)| {
        decoder(payload)
            .filter(|url| !url.trim().is_empty())
            .map(|url| ResultImage { url, shape: *shape })
    })
}
