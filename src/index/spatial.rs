use std::collections::HashMap;
use roaring::RoaringBitmap;
use crate::core::types::BoundingBox;

const WGS84_LON_LAT: &str = "CRS:84";

/// Canonical spelling of a coordinate reference identifier.
///
/// The EPSG:4326 family, the OGC CRS84 forms and `WGS84` all collapse to
/// `CRS:84`; other EPSG references collapse to `EPSG:<code>`.
pub fn normalize_crs(crs: &str) -> String {
    let upper = crs.trim().to_uppercase();

    let wgs84 = ["CRS:84", "CRS84", "WGS84", "EPSG:4326"];
    if wgs84.contains(&upper.as_str()) || upper.ends_with("CRS84") {
        return WGS84_LON_LAT.to_string();
    }

    if upper.contains("EPSG") {
        let code: String = upper
            .rsplit(|c: char| !c.is_ascii_digit())
            .find(|part| !part.is_empty())
            .unwrap_or_default()
            .to_string();
        if code == "4326" {
            return WGS84_LON_LAT.to_string();
        }
        if !code.is_empty() {
            return format!("EPSG:{}", code);
        }
    }

    upper
}

pub fn same_crs(a: &str, b: &str) -> bool {
    normalize_crs(a) == normalize_crs(b)
}

/// Ordinals whose envelope intersects `query`; records without geometry never match
pub fn intersecting(geometries: &HashMap<u32, BoundingBox>, query: &BoundingBox) -> RoaringBitmap {
    geometries
        .iter()
        .filter(|(_, envelope)| envelope.intersects(query))
        .map(|(doc, _)| *doc)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_spellings_collapse() {
        for crs in [
            "EPSG:4326",
            "epsg:4326",
            "urn:ogc:def:crs:EPSG::4326",
            "http://www.opengis.net/def/crs/EPSG/0/4326",
            "urn:ogc:def:crs:OGC:1.3:CRS84",
            "CRS:84",
        ] {
            assert_eq!(normalize_crs(crs), "CRS:84", "{}", crs);
        }
    }

    #[test]
    fn test_other_epsg_codes_kept() {
        assert_eq!(normalize_crs("urn:ogc:def:crs:EPSG::3857"), "EPSG:3857");
        assert!(!same_crs("EPSG:3857", "EPSG:4326"));
    }

    #[test]
    fn test_intersecting_skips_disjoint() {
        let mut geometries = HashMap::new();
        geometries.insert(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0, "CRS:84"));
        geometries.insert(2, BoundingBox::new(50.0, 50.0, 60.0, 60.0, "CRS:84"));

        let hits = intersecting(&geometries, &BoundingBox::new(-5.0, -5.0, 0.5, 0.5, "CRS:84"));
        assert!(hits.contains(1));
        assert!(!hits.contains(2));
    }
}
