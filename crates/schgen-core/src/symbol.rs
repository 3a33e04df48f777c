//! Reusable symbol definitions and their `lib_symbols` representation.

use schgen_sexpr::query::{at_prop, child_list, child_lists, number_prop, property_value};
use schgen_sexpr::{kv, ListBuilder, Sexpr};
use serde::{Deserialize, Serialize};

use crate::geometry::{snap, Point, Rotation};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinType {
    #[default]
    Passive,
    Input,
    Output,
    Bidirectional,
    PowerIn,
    PowerOut,
    Unspecified,
}

impl PinType {
    pub fn as_str(self) -> &'static str {
        match self {
            PinType::Passive => "passive",
            PinType::Input => "input",
            PinType::Output => "output",
            PinType::Bidirectional => "bidirectional",
            PinType::PowerIn => "power_in",
            PinType::PowerOut => "power_out",
            PinType::Unspecified => "unspecified",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "passive" => PinType::Passive,
            "input" => PinType::Input,
            "output" => PinType::Output,
            "bidirectional" => PinType::Bidirectional,
            "power_in" => PinType::PowerIn,
            "power_out" => PinType::PowerOut,
            "unspecified" => PinType::Unspecified,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinDefinition {
    pub number: String,
    pub name: String,
    /// Connection point relative to the symbol origin, library coordinates (Y up).
    pub at: Point,
    /// Direction from the connection point toward the symbol body.
    #[serde(default)]
    pub orientation: Rotation,
    #[serde(default = "default_pin_length")]
    pub length: f64,
    #[serde(default, rename = "type")]
    pub pin_type: PinType,
}

fn default_pin_length() -> f64 {
    2.54
}

impl PinDefinition {
    pub fn new(number: &str, name: &str, at: Point, orientation: Rotation) -> Self {
        Self {
            number: number.to_string(),
            name: name.to_string(),
            at,
            orientation,
            length: default_pin_length(),
            pin_type: PinType::Passive,
        }
    }

    pub fn with_type(mut self, pin_type: PinType) -> Self {
        self.pin_type = pin_type;
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }
}

/// A named, immutable component shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDefinition {
    pub name: String,
    /// Library nickname; the definition is addressed as `namespace:name`.
    pub namespace: String,
    pub reference_prefix: String,
    pub power: bool,
    pub pins: Vec<PinDefinition>,
    /// Graphic items drawn for the symbol body.
    pub body: Vec<Sexpr>,
    pub default_footprint: Option<String>,
}

impl SymbolDefinition {
    pub fn new(name: &str, namespace: &str, pins: Vec<PinDefinition>, body: Vec<Sexpr>) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            reference_prefix: "U".to_string(),
            power: false,
            pins,
            body,
            default_footprint: None,
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.reference_prefix = prefix.to_string();
        self
    }

    pub fn with_footprint(mut self, footprint: &str) -> Self {
        self.default_footprint = Some(footprint.to_string());
        self
    }

    pub fn as_power(mut self) -> Self {
        self.power = true;
        self.reference_prefix = "#PWR".to_string();
        self
    }

    pub fn lib_id(&self) -> String {
        format!("{}:{}", self.namespace, self.name)
    }

    pub fn pin(&self, number: &str) -> Result<&PinDefinition> {
        self.pins
            .iter()
            .find(|pin| pin.number == number)
            .ok_or_else(|| Error::UnknownPin {
                symbol: self.lib_id(),
                pin: number.to_string(),
            })
    }

    /// `(symbol "ns:name" ...)` entry for a sheet's `lib_symbols` section.
    pub fn to_sexpr(&self) -> Sexpr {
        let mut node = ListBuilder::node("symbol");
        node.push(Sexpr::string(self.lib_id()));
        if self.power {
            node.push(Sexpr::list(vec![Sexpr::symbol("power")]));
        }
        node.push(kv("exclude_from_sim", false))
            .push(kv("in_bom", !self.power))
            .push(kv("on_board", true))
            .push(library_property(
                "Reference",
                &self.reference_prefix,
                Point::new(0.0, 5.08),
                self.power,
            ))
            .push(library_property(
                "Value",
                &self.name,
                Point::new(0.0, -5.08),
                false,
            ))
            .push(library_property(
                "Footprint",
                self.default_footprint.as_deref().unwrap_or_default(),
                Point::new(0.0, 0.0),
                true,
            ));

        let mut graphics = ListBuilder::node("symbol");
        graphics
            .push(Sexpr::string(format!("{}_0_1", self.name)))
            .extend(self.body.iter().cloned());
        node.push(graphics.build());

        let mut pins = ListBuilder::node("symbol");
        pins.push(Sexpr::string(format!("{}_1_1", self.name)))
            .extend(self.pins.iter().map(pin_to_sexpr));
        node.push(pins.build());

        node.build()
    }

    /// Read back an entry written by [`SymbolDefinition::to_sexpr`].
    pub fn from_sexpr(node: &Sexpr) -> Result<Self> {
        let items = node
            .as_list()
            .filter(|_| node.tag() == Some("symbol"))
            .ok_or_else(|| {
                Error::MalformedDocument("expected (symbol ...) in lib_symbols".into())
            })?;
        let lib_id = items
            .get(1)
            .and_then(Sexpr::as_str)
            .ok_or_else(|| Error::MalformedDocument("library symbol without a name".into()))?;
        let (namespace, name) = lib_id.split_once(':').ok_or_else(|| {
            Error::MalformedDocument(format!("library symbol '{lib_id}' has no namespace"))
        })?;

        let power = items
            .iter()
            .any(|item| item.tag() == Some("power"));
        let reference_prefix = property_value(items, "Reference").unwrap_or("U").to_string();
        let default_footprint = property_value(items, "Footprint")
            .filter(|fp| !fp.is_empty())
            .map(str::to_string);

        let mut body = Vec::new();
        let mut pins = Vec::new();
        for unit in child_lists(items, "symbol") {
            let Some(unit_name) = unit.get(1).and_then(Sexpr::as_str) else {
                continue;
            };
            if unit_name.ends_with("_0_1") {
                body.extend(unit.iter().skip(2).cloned());
            } else {
                for pin in child_lists(unit, "pin") {
                    pins.push(pin_from_sexpr(lib_id, pin)?);
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            reference_prefix,
            power,
            pins,
            body,
            default_footprint,
        })
    }
}

pub(crate) fn text_effects(hidden: bool) -> Sexpr {
    let mut effects = ListBuilder::node("effects");
    effects
        .push(Sexpr::list(vec![
            Sexpr::symbol("font"),
            Sexpr::list(vec![
                Sexpr::symbol("size"),
                Sexpr::float(1.27),
                Sexpr::float(1.27),
            ]),
        ]))
        .push_if(hidden, "hide");
    effects.build()
}

fn library_property(name: &str, value: &str, at: Point, hidden: bool) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("property"),
        Sexpr::string(name),
        Sexpr::string(value),
        Sexpr::list(vec![
            Sexpr::symbol("at"),
            Sexpr::float(snap(at.x)),
            Sexpr::float(snap(at.y)),
            Sexpr::int(0),
        ]),
        text_effects(hidden),
    ])
}

fn pin_to_sexpr(pin: &PinDefinition) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("pin"),
        Sexpr::symbol(pin.pin_type.as_str()),
        Sexpr::symbol("line"),
        Sexpr::list(vec![
            Sexpr::symbol("at"),
            Sexpr::float(snap(pin.at.x)),
            Sexpr::float(snap(pin.at.y)),
            Sexpr::float(pin.orientation.degrees()),
        ]),
        kv("length", snap(pin.length)),
        Sexpr::list(vec![
            Sexpr::symbol("name"),
            Sexpr::string(pin.name.clone()),
            text_effects(false),
        ]),
        Sexpr::list(vec![
            Sexpr::symbol("number"),
            Sexpr::string(pin.number.clone()),
            text_effects(false),
        ]),
    ])
}

fn pin_from_sexpr(lib_id: &str, pin: &[Sexpr]) -> Result<PinDefinition> {
    let malformed = |what: &str| Error::MalformedDocument(format!("pin of '{lib_id}': {what}"));

    let pin_type = pin
        .get(1)
        .and_then(Sexpr::as_sym)
        .and_then(PinType::parse)
        .ok_or_else(|| malformed("unknown electrical type"))?;
    let (x, y, angle) = at_prop(pin).ok_or_else(|| malformed("missing (at ...)"))?;
    let orientation = Rotation::try_from(angle.unwrap_or(0.0))?;
    let length = number_prop(pin, "length").unwrap_or_else(default_pin_length);
    let text_of = |tag: &str| {
        child_list(pin, tag)
            .and_then(|list| list.get(1))
            .and_then(Sexpr::as_str)
            .map(str::to_string)
    };
    let number = text_of("number").ok_or_else(|| malformed("missing (number ...)"))?;
    let name = text_of("name").unwrap_or_default();

    Ok(PinDefinition {
        number,
        name,
        at: Point::new(x, y),
        orientation,
        length,
        pin_type,
    })
}
