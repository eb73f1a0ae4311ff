/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */
#![allow(unused)]

mod common;

use odin_airspace::{
    AirspaceConfig, AirspaceZone, AltitudeLimit, GeoPos, LonLat, RestrictionFlags, ZoneError, load_config,
    zones::{parse_altitude, parse_altitude_ft}
};
use common::zone;

fn restricted_classes ()->Vec<String> { AirspaceConfig::default().restricted_classes }

// run with "cargo test --test test_zones -- --nocapture"

#[test]
fn test_altitude_bounds () {
    assert_eq!( parse_altitude_ft("FL100"), Some(10000.0));

    let m = parse_altitude_ft("3000M").unwrap();
    println!("3000M = {m:.1} ft");
    assert!( (m - 9843.0).abs() < 1.0);

    assert_eq!( parse_altitude_ft("GND"), Some(0.0));
    assert!( parse_altitude_ft("UNL").unwrap().is_infinite());
    assert_eq!( parse_altitude_ft("banana"), None);
}

#[test]
fn test_agl_buffer () {
    let z = zone( "Z1", "TEST", "DANGER", 14.0, 46.0, 15.0, 47.0, AltitudeLimit::agl("GND"), AltitudeLimit::agl("10000FT"));
    let rz = z.resolve( 1000.0).unwrap();
    assert_eq!( rz.lower_ft, 1000.0);
    assert_eq!( rz.upper_ft, 11000.0);

    // flight levels are not terrain relative
    let z = zone( "Z2", "TEST", "DANGER", 14.0, 46.0, 15.0, 47.0, AltitudeLimit::msl("2000FT"), AltitudeLimit::agl("FL100"));
    let rz = z.resolve( 1000.0).unwrap();
    assert_eq!( rz.lower_ft, 2000.0);
    assert_eq!( rz.upper_ft, 10000.0);
}

#[test]
fn test_restricted_filter () {
    let classes = restricted_classes();

    let z = zone( "Z1", "LJP1 KRSKO", "prohibited", 14.0, 46.0, 15.0, 47.0, AltitudeLimit::msl("GND"), AltitudeLimit::msl("UNL"));
    assert!( z.is_restricted( &classes));
    assert!( z.is_alertable());

    let z = zone( "Z2", "LJUBLJANA CTR", "D", 14.0, 46.0, 15.0, 47.0, AltitudeLimit::msl("GND"), AltitudeLimit::msl("FL095"));
    assert!( !z.is_restricted( &classes));

    let mut z = zone( "Z3", "CERKLJE TRA", "D", 14.0, 46.0, 15.0, 47.0, AltitudeLimit::msl("GND"), AltitudeLimit::msl("FL095"));
    z.restriction_flags = RestrictionFlags { notam_only: true, special_agreement: false };
    assert!( z.is_restricted( &classes));
    assert!( !z.is_alertable());

    let z = zone( "Z4", "Military training area 7", "TRA", 14.0, 46.0, 15.0, 47.0, AltitudeLimit::msl("GND"), AltitudeLimit::msl("FL095"));
    assert!( z.is_restricted( &classes));
    assert!( z.is_alertable());

    let z = zone( "Z5", "LJR1", "RESTRICTED", 14.0, 46.0, 15.0, 47.0, AltitudeLimit::msl("GND"), AltitudeLimit::msl("FL095"));
    assert!( z.is_restricted( &classes));
    assert!( !z.is_alertable());
}

#[test]
fn test_malformed_zones () {
    let mut z = zone( "Z1", "DANGER AREA", "DANGER", 14.0, 46.0, 15.0, 47.0, AltitudeLimit::msl("GND"), AltitudeLimit::msl("FL100"));
    z.polygon.truncate(2);
    assert_eq!( z.resolve( 1000.0), Err(ZoneError::DegeneratePolygon("Z1".to_string())));

    // closing vertex does not count as a vertex of its own
    z.polygon = vec![ LonLat::new(14.0,46.0), LonLat::new(15.0,46.0), LonLat::new(14.0,46.0) ];
    assert!( z.resolve( 1000.0).is_err());

    let z = zone( "Z2", "DANGER AREA", "DANGER", 14.0, 46.0, 15.0, 47.0, AltitudeLimit::msl("GND"), AltitudeLimit::msl("HIGH"));
    match z.resolve( 1000.0) {
        Err(ZoneError::InvalidAltitude{ zone, bound }) => {
            assert_eq!( zone, "Z2");
            assert_eq!( bound, "HIGH");
        }
        other => panic!("expected altitude error, got {other:?}")
    }
}

#[test]
fn test_containment () {
    let z = zone( "Z1", "DANGER AREA", "DANGER", 14.0, 46.0, 15.0, 47.0, AltitudeLimit::msl("2000FT"), AltitudeLimit::msl("FL100"));
    let rz = z.resolve( 1000.0).unwrap();

    let inside = GeoPos::from_lon_lat_degrees_alt_meters( 14.5, 46.5, 1000.0); // ~3281 ft
    assert!( rz.contains( &inside));

    let too_low = GeoPos::from_lon_lat_degrees_alt_meters( 14.5, 46.5, 300.0);
    assert!( !rz.contains( &too_low));

    let too_high = GeoPos::from_lon_lat_degrees_alt_meters( 14.5, 46.5, 3500.0);
    assert!( !rz.contains( &too_high));

    let outside = GeoPos::from_lon_lat_degrees_alt_meters( 15.5, 46.5, 1000.0);
    assert!( !rz.contains( &outside));
}

#[test]
fn test_load_zones () {
    let path = concat!( env!("CARGO_MANIFEST_DIR"), "/configs/zones.ron");
    let zones: Vec<AirspaceZone> = load_config( path).unwrap();
    for z in &zones { println!("{z}"); }

    assert_eq!( zones.len(), 3);
    let classes = restricted_classes();
    assert!( zones.iter().all( |z| z.is_restricted( &classes)));
    assert!( zones.iter().all( |z| z.resolve( 1000.0).is_ok()));
}

#[test]
fn test_load_config () {
    let path = concat!( env!("CARGO_MANIFEST_DIR"), "/configs/airspace.ron");
    let config: AirspaceConfig = load_config( path).unwrap();
    assert!( config.validate().is_ok());
    assert_eq!( config.daily_limit, 400);
    assert_eq!( config.min_request_interval, std::time::Duration::from_secs(30));

    let bbox = config.region.bounding_box().unwrap();
    println!("region: {bbox}");
    assert!( bbox.contains( 14.5, 46.0));
}
