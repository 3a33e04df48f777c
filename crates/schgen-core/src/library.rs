//! Built-in symbol definitions: passives, connectors, generic IC boxes and power rails.

use schgen_sexpr::{kv, Sexpr};

use crate::geometry::{snap, Point, Rotation};
use crate::symbol::{PinDefinition, PinType, SymbolDefinition};

const GRID: f64 = 2.54;

fn stroke(width: f64) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("stroke"),
        kv("width", width),
        kv("type", "default"),
    ])
}

fn fill(kind: &str) -> Sexpr {
    Sexpr::list(vec![Sexpr::symbol("fill"), kv("type", kind)])
}

fn xy(p: Point) -> Sexpr {
    Sexpr::list(vec![Sexpr::symbol("xy"), Sexpr::float(p.x), Sexpr::float(p.y)])
}

fn rectangle(start: Point, end: Point, fill_kind: &str) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("rectangle"),
        Sexpr::list(vec![Sexpr::symbol("start"), Sexpr::float(start.x), Sexpr::float(start.y)]),
        Sexpr::list(vec![Sexpr::symbol("end"), Sexpr::float(end.x), Sexpr::float(end.y)]),
        stroke(0.254),
        fill(fill_kind),
    ])
}

fn polyline(points: &[Point]) -> Sexpr {
    let mut pts = vec![Sexpr::symbol("pts")];
    pts.extend(points.iter().copied().map(xy));
    Sexpr::list(vec![
        Sexpr::symbol("polyline"),
        Sexpr::list(pts),
        stroke(0.254),
        fill("none"),
    ])
}

/// Two pins on the vertical axis, pin 1 on top. Each pin starts at the body
/// edge (`body_half` from the origin) and reaches outward by `length`.
fn vertical_pair(body_half: f64, length: f64) -> Vec<PinDefinition> {
    let reach = snap(body_half + length);
    vec![
        PinDefinition::new("1", "~", Point::new(0.0, reach), Rotation::R270).with_length(length),
        PinDefinition::new("2", "~", Point::new(0.0, -reach), Rotation::R90).with_length(length),
    ]
}

/// Two pins on the horizontal axis, pin 1 on the left.
fn horizontal_pair(first: &str, second: &str) -> Vec<PinDefinition> {
    vec![
        PinDefinition::new("1", first, Point::new(-3.81, 0.0), Rotation::R0),
        PinDefinition::new("2", second, Point::new(3.81, 0.0), Rotation::R180),
    ]
}

pub fn resistor() -> SymbolDefinition {
    SymbolDefinition::new(
        "R",
        "Device",
        vertical_pair(2.54, 1.27),
        vec![rectangle(
            Point::new(-1.016, -2.54),
            Point::new(1.016, 2.54),
            "none",
        )],
    )
    .with_prefix("R")
}

pub fn capacitor() -> SymbolDefinition {
    SymbolDefinition::new(
        "C",
        "Device",
        vertical_pair(1.016, 2.794),
        vec![
            polyline(&[Point::new(-2.032, -0.762), Point::new(2.032, -0.762)]),
            polyline(&[Point::new(-2.032, 0.762), Point::new(2.032, 0.762)]),
        ],
    )
    .with_prefix("C")
}

pub fn inductor() -> SymbolDefinition {
    SymbolDefinition::new(
        "L",
        "Device",
        vertical_pair(2.54, 1.27),
        vec![rectangle(
            Point::new(-0.762, -2.54),
            Point::new(0.762, 2.54),
            "outline",
        )],
    )
    .with_prefix("L")
}

fn diode_body() -> Vec<Sexpr> {
    vec![
        polyline(&[Point::new(-1.27, 1.27), Point::new(-1.27, -1.27)]),
        polyline(&[
            Point::new(1.27, 1.27),
            Point::new(1.27, -1.27),
            Point::new(-1.27, 0.0),
            Point::new(1.27, 1.27),
        ]),
    ]
}

pub fn diode() -> SymbolDefinition {
    SymbolDefinition::new("D", "Device", horizontal_pair("K", "A"), diode_body()).with_prefix("D")
}

pub fn led() -> SymbolDefinition {
    SymbolDefinition::new("LED", "Device", horizontal_pair("K", "A"), diode_body())
        .with_prefix("D")
}

pub fn crystal() -> SymbolDefinition {
    SymbolDefinition::new(
        "Crystal",
        "Device",
        horizontal_pair("1", "2"),
        vec![rectangle(
            Point::new(-1.143, -2.54),
            Point::new(1.143, 2.54),
            "none",
        )],
    )
    .with_prefix("Y")
}

/// Single-row pin header `Conn_01xNN`, pins on the left edge from the top.
pub fn connector(pins: usize) -> SymbolDefinition {
    let top = (pins.saturating_sub(1) as f64) * GRID / 2.0;
    let pin_defs = (0..pins)
        .map(|i| {
            let number = (i + 1).to_string();
            let name = format!("Pin_{number}");
            PinDefinition::new(
                &number,
                &name,
                Point::new(-5.08, top - i as f64 * GRID),
                Rotation::R0,
            )
            .with_length(3.81)
        })
        .collect();
    SymbolDefinition::new(
        &format!("Conn_01x{pins:02}"),
        "Connector",
        pin_defs,
        vec![rectangle(
            Point::new(-1.27, top + GRID / 2.0),
            Point::new(1.27, -top - GRID / 2.0),
            "background",
        )],
    )
    .with_prefix("J")
}

/// Generic rectangular IC: `left` pins numbered first, top to bottom, then `right`.
pub fn ic(name: &str, namespace: &str, left: &[&str], right: &[&str]) -> SymbolDefinition {
    let rows = left.len().max(right.len()).max(1);
    let top = (rows - 1) as f64 * GRID / 2.0;
    let half_width = 5.08;

    let column = |names: &[&str], first_number: usize, x: f64, orientation: Rotation| {
        names
            .iter()
            .enumerate()
            .map(|(i, pin_name)| {
                PinDefinition::new(
                    &(first_number + i).to_string(),
                    pin_name,
                    Point::new(x, top - i as f64 * GRID),
                    orientation,
                )
                .with_type(PinType::Bidirectional)
            })
            .collect::<Vec<_>>()
    };

    let mut pins = column(left, 1, -(half_width + GRID), Rotation::R0);
    pins.extend(column(
        right,
        left.len() + 1,
        half_width + GRID,
        Rotation::R180,
    ));

    SymbolDefinition::new(
        name,
        namespace,
        pins,
        vec![rectangle(
            Point::new(-half_width, top + GRID),
            Point::new(half_width, -top - GRID),
            "background",
        )],
    )
    .with_prefix("U")
}

/// Power-rail symbol for `net`. Ground-like rails hang below their pin, supplies sit above.
pub fn power(net: &str) -> SymbolDefinition {
    let is_ground = net.to_ascii_uppercase().contains("GND");
    let (orientation, tip) = if is_ground {
        (Rotation::R270, -1.27)
    } else {
        (Rotation::R90, 1.27)
    };
    let pin = PinDefinition::new("1", net, Point::new(0.0, 0.0), orientation)
        .with_type(PinType::PowerIn)
        .with_length(0.0);
    SymbolDefinition::new(
        net,
        "power",
        vec![pin],
        vec![polyline(&[
            Point::new(0.0, 0.0),
            Point::new(0.0, tip),
            Point::new(-1.27, tip),
            Point::new(1.27, tip),
        ])],
    )
    .as_power()
}

/// Flag marking a net as driven, for ERC tools downstream.
pub fn power_flag() -> SymbolDefinition {
    let pin = PinDefinition::new("1", "pwr", Point::new(0.0, 0.0), Rotation::R90)
        .with_type(PinType::PowerOut)
        .with_length(0.0);
    let mut flag = SymbolDefinition::new(
        "PWR_FLAG",
        "power",
        vec![pin],
        vec![polyline(&[
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.27),
            Point::new(-1.016, 1.905),
            Point::new(0.0, 2.54),
            Point::new(1.016, 1.905),
            Point::new(0.0, 1.27),
        ])],
    )
    .as_power();
    flag.reference_prefix = "#FLG".to_string();
    flag
}

/// Everything registered by [`crate::SymbolCatalog::with_standard_library`].
pub fn standard() -> Vec<SymbolDefinition> {
    let mut defs = vec![
        resistor(),
        capacitor(),
        inductor(),
        diode(),
        led(),
        crystal(),
    ];
    defs.extend((2..=8).map(connector));
    defs.extend(["GND", "+3V3", "+5V", "VCC", "VBUS"].into_iter().map(power));
    defs.push(power_flag());
    defs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_pins_are_numbered_top_down() {
        let conn = connector(4);
        assert_eq!(conn.lib_id(), "Connector:Conn_01x04");
        let ys: Vec<f64> = conn.pins.iter().map(|p| p.at.y).collect();
        assert_eq!(ys, vec![3.81, 1.27, -1.27, -3.81]);
    }

    #[test]
    fn two_pin_passives_keep_pins_outside_the_body() {
        for def in [resistor(), inductor(), capacitor()] {
            let tips: Vec<Point> = def.pins.iter().map(|p| p.at).collect();
            assert_eq!(tips, vec![Point::new(0.0, 3.81), Point::new(0.0, -3.81)], "{}", def.name);
        }
        let r = resistor();
        assert_eq!(snap(r.pins[0].at.y - r.pins[0].length), 2.54);
    }

    #[test]
    fn ic_numbers_left_then_right() {
        let mcu = ic("MCU", "schgen", &["VDD", "PA0", "PA1"], &["GND", "SWDIO"]);
        let numbers: Vec<&str> = mcu.pins.iter().map(|p| p.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(mcu.pin("4").unwrap().name, "GND");
        assert_eq!(mcu.pin("4").unwrap().orientation, Rotation::R180);
        assert_eq!(mcu.reference_prefix, "U");
    }

    #[test]
    fn power_symbols_use_the_reserved_class() {
        assert_eq!(power("GND").reference_prefix, "#PWR");
        assert_eq!(power("+3V3").pins[0].orientation, Rotation::R90);
        assert_eq!(power_flag().reference_prefix, "#FLG");
        assert!(standard().iter().filter(|d| d.power).count() >= 6);
    }
}
