//! Command types shared by the integration suites

use indexmap::IndexMap;
use modframe_rs::command::{
    Command, CommandType, DynamicCommand, DynamicCommandInfo, Field, Schema,
};
use modframe_rs::logging::LogService;
use modframe_rs::module::{ModuleItem, ValueType};
use modframe_rs::{Context, Value};
use std::any::Any;
use std::sync::Arc;

macro_rules! any_impls {
    () => {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
            self
        }
    };
}

/// Blur with a required radius and an optional mode that has a default
#[derive(Debug, Default)]
pub struct Blur {
    pub radius: Option<f64>,
    pub mode: Option<String>,
    pub result: Option<String>,
}

impl Command for Blur {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        let radius = self.radius.unwrap_or_default();
        let mode = self.mode.as_deref().unwrap_or("?");
        self.result = Some(format!("blurred r={} ({})", radius, mode));
        Ok(())
    }

    any_impls!();
}

impl CommandType for Blur {
    fn class_name() -> &'static str {
        "filters.Blur"
    }

    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::new(
                ModuleItem::input("radius", ValueType::Float)
                    .with_label("Radius")
                    .with_range(0.0, 100.0),
                |b: &Blur| b.radius.map(Value::Float).unwrap_or_default(),
                |b: &mut Blur, v| {
                    b.radius = v.as_float();
                    Some(())
                },
            ))
            .field(Field::new(
                ModuleItem::input("mode", ValueType::Text)
                    .with_default("fast")
                    .with_choices(["fast", "exact"]),
                |b: &Blur| b.mode.clone().map(Value::from).unwrap_or_default(),
                |b: &mut Blur, v| {
                    b.mode = v.into_text();
                    Some(())
                },
            ))
            .field(Field::new(
                ModuleItem::output("result", ValueType::Text).with_label("Blurred"),
                |b: &Blur| b.result.clone().map(Value::from).unwrap_or_default(),
                |b: &mut Blur, v| {
                    b.result = v.into_text();
                    Some(())
                },
            ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}

/// Splits a list of numbers into a `{low, high}` map
#[derive(Debug, Default)]
pub struct Histogram {
    pub data: Vec<Value>,
    pub bins: IndexMap<String, Value>,
}

impl Command for Histogram {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        let (low, high): (Vec<f64>, Vec<f64>) = self
            .data
            .iter()
            .filter_map(Value::as_float)
            .partition(|v| *v < 0.5);
        self.bins.insert("low".into(), Value::Int(low.len() as i64));
        self.bins.insert("high".into(), Value::Int(high.len() as i64));
        Ok(())
    }

    any_impls!();
}

impl CommandType for Histogram {
    fn class_name() -> &'static str {
        "analysis.Histogram"
    }

    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::new(
                ModuleItem::input("data", ValueType::List),
                |h: &Histogram| Value::List(h.data.clone()),
                |h: &mut Histogram, v| {
                    h.data = v.into_list()?;
                    Some(())
                },
            ))
            .field(Field::new(
                ModuleItem::output("bins", ValueType::Map),
                |h: &Histogram| Value::Map(h.bins.clone()),
                |h: &mut Histogram, v| {
                    h.bins = v.into_map()?;
                    Some(())
                },
            ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}

/// One valid field, one immutable field and one duplicate
#[derive(Debug, Default)]
pub struct Malformed {
    pub ok: i64,
    pub frozen: i64,
}

impl Command for Malformed {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        Ok(())
    }

    any_impls!();
}

impl CommandType for Malformed {
    fn class_name() -> &'static str {
        "broken.Malformed"
    }

    fn schema() -> Schema<Self> {
        let ok = || {
            Field::new(
                ModuleItem::input("ok", ValueType::Int),
                |m: &Malformed| Value::Int(m.ok),
                |m: &mut Malformed, v| {
                    m.ok = v.as_int()?;
                    Some(())
                },
            )
        };
        Schema::new()
            .field(ok())
            .field(Field::read_only(
                ModuleItem::input("frozen", ValueType::Int),
                |m: &Malformed| Value::Int(m.frozen),
            ))
            .field(ok())
            .field(Field::message("note", "messages may be final"))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}

/// Always fails in its run body
#[derive(Debug, Default)]
pub struct Exploding;

impl Command for Exploding {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }

    any_impls!();
}

impl CommandType for Exploding {
    fn class_name() -> &'static str {
        "broken.Exploding"
    }

    fn schema() -> Schema<Self> {
        Schema::new().field(Field::new(
            ModuleItem::output("never", ValueType::Int),
            |_: &Exploding| Value::Null,
            |_: &mut Exploding, _| Some(()),
        ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Exploding)
    }
}

/// Base part embedded by [`Stamp`]
#[derive(Debug, Default)]
pub struct Tagged {
    pub tag: String,
}

impl Tagged {
    pub fn schema() -> Schema<Tagged> {
        Schema::new().field(Field::new(
            ModuleItem::input("tag", ValueType::Text),
            |t: &Tagged| Value::from(t.tag.as_str()),
            |t: &mut Tagged, v| {
                t.tag = v.into_text()?;
                Some(())
            },
        ))
    }
}

/// Inherits `tag` from [`Tagged`]
#[derive(Debug, Default)]
pub struct Stamp {
    pub base: Tagged,
    pub copies: Option<i64>,
    pub stamped: Vec<Value>,
}

impl Stamp {
    fn base(&self) -> &Tagged {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Tagged {
        &mut self.base
    }
}

impl Command for Stamp {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        self.stamped = (0..self.copies.unwrap_or_default())
            .map(|i| Value::from(format!("{}-{}", self.base.tag, i)))
            .collect();
        Ok(())
    }

    any_impls!();
}

impl CommandType for Stamp {
    fn class_name() -> &'static str {
        "util.Stamp"
    }

    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::new(
                ModuleItem::input("copies", ValueType::Int).with_default(1),
                |s: &Stamp| s.copies.map(Value::Int).unwrap_or_default(),
                |s: &mut Stamp, v| {
                    s.copies = v.as_int();
                    Some(())
                },
            ))
            .inherit(Tagged::schema(), Stamp::base, Stamp::base_mut)
            .field(Field::new(
                ModuleItem::output("stamped", ValueType::List).with_label("Stamps"),
                |s: &Stamp| Value::List(s.stamped.clone()),
                |s: &mut Stamp, v| {
                    s.stamped = v.into_list()?;
                    Some(())
                },
            ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}

/// Uses an injected log sink; must be initialized before running
#[derive(Default)]
pub struct Audit {
    pub log: Option<Arc<dyn LogService>>,
    pub ready: bool,
    pub message: String,
}

impl Command for Audit {
    fn initialize(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        self.ready = true;
        Ok(())
    }

    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        anyhow::ensure!(self.ready, "not initialized");
        let log = self
            .log
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("log not injected"))?;
        log.warn(&format!("audit: {}", self.message));
        Ok(())
    }

    any_impls!();
}

impl CommandType for Audit {
    fn class_name() -> &'static str {
        "util.Audit"
    }

    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::new(
                ModuleItem::service::<dyn LogService>("log"),
                |a: &Audit| a.log.clone().map(Value::service).unwrap_or_default(),
                |a: &mut Audit, v| {
                    a.log = Some(v.as_service()?.get::<dyn LogService>()?);
                    Some(())
                },
            ))
            .field(Field::new(
                ModuleItem::input("message", ValueType::Text).optional(),
                |a: &Audit| Value::from(a.message.as_str()),
                |a: &mut Audit, v| {
                    a.message = v.into_text().unwrap_or_default();
                    Some(())
                },
            ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}

/// Declares `prefix` statically and one `col<i>` input per configured column
#[derive(Debug)]
pub struct Table {
    pub prefix: String,
    pub columns: usize,
}

impl Command for Table {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        Ok(())
    }

    any_impls!();
}

impl CommandType for Table {
    fn class_name() -> &'static str {
        "table.Table"
    }

    fn schema() -> Schema<Self> {
        Schema::new().field(Field::new(
            ModuleItem::input("prefix", ValueType::Text),
            |t: &Table| Value::from(t.prefix.as_str()),
            |t: &mut Table, v| {
                t.prefix = v.into_text()?;
                Some(())
            },
        ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self {
            prefix: "row".into(),
            columns: 2,
        })
    }
}

impl DynamicCommand for Table {
    fn contribute(&self, info: &mut DynamicCommandInfo, _ctx: &Context) {
        for i in 0..self.columns {
            info.add_item(ModuleItem::input(format!("col{}", i), ValueType::Int).with_default(0));
        }
        info.add_item(ModuleItem::output("summary", ValueType::Text));
    }

    fn run_dynamic(
        &mut self,
        values: &mut IndexMap<String, Value>,
        _ctx: &Context,
    ) -> anyhow::Result<()> {
        let total: i64 = (0..self.columns)
            .filter_map(|i| values.get(&format!("col{}", i)).and_then(Value::as_int))
            .sum();
        values.insert(
            "summary".into(),
            Value::from(format!("{}: {}", self.prefix, total)),
        );
        Ok(())
    }
}

/// Declares "threshold" twice: a read-only output first, then a mutable
/// input that should win. Also takes the log service.
#[derive(Default)]
pub struct Threshold {
    pub value: Option<i64>,
    pub log: Option<Arc<dyn LogService>>,
}

impl Command for Threshold {
    fn run(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        if let Some(log) = &self.log {
            log.warn(&format!("threshold {}", self.value.unwrap_or_default()));
        }
        Ok(())
    }

    any_impls!();
}

impl CommandType for Threshold {
    fn class_name() -> &'static str {
        "segment.Threshold"
    }

    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::read_only(
                ModuleItem::output("threshold", ValueType::Int),
                |_: &Threshold| Value::Int(-1),
            ))
            .field(Field::new(
                ModuleItem::input("threshold", ValueType::Int),
                |t: &Threshold| t.value.map(Value::Int).unwrap_or_default(),
                |t: &mut Threshold, v| {
                    t.value = Some(v.as_int()?);
                    Some(())
                },
            ))
            .field(Field::new(
                ModuleItem::service::<dyn LogService>("log"),
                |t: &Threshold| t.log.clone().map(Value::service).unwrap_or_default(),
                |t: &mut Threshold, v| {
                    t.log = Some(v.as_service()?.get::<dyn LogService>()?);
                    Some(())
                },
            ))
    }

    fn create() -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}

impl DynamicCommand for Threshold {}
