use chrono::{Datelike, NaiveDate, Timelike};
use indoc::indoc;
use saphyr_bind::naming::CamelCase;
use saphyr_bind::{
    ConvertContext, Deserializer, DuplicateKeyPolicy, EnumDescriptor, Error, ObjectDescriptor,
    ScalarConverter, ScalarInput, ScalarKind, TypeDescriptor, Value,
};

fn bind(yaml: &str, ty: &TypeDescriptor) -> Result<Value, Error> {
    Deserializer::default().deserialize(yaml, ty).map(|bound| bound.root)
}

#[test]
fn integers_in_every_radix() -> anyhow::Result<()> {
    let ty = TypeDescriptor::sequence(TypeDescriptor::i64());
    let values: Vec<i64> = Deserializer::default()
        .deserialize_into("[42, -7, 0x1F, 0o17, 0b101, 1_000, +3]\n", &ty)?;
    assert_eq!(values, [42, -7, 31, 15, 5, 1000, 3]);
    Ok(())
}

#[test]
fn out_of_range_integer_is_a_conversion_error() {
    let err = bind("300\n", &TypeDescriptor::scalar(ScalarKind::U8)).unwrap_err();
    match err.without_snippet() {
        Error::ScalarConversion { text, kind, .. } => {
            assert_eq!(text, "300");
            assert_eq!(kind, "u8");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn floats_and_special_values() -> anyhow::Result<()> {
    let ty = TypeDescriptor::sequence(TypeDescriptor::f64());
    let values: Vec<f64> =
        Deserializer::default().deserialize_into("[1.5, -2e3, .inf, -.Inf]\n", &ty)?;
    assert_eq!(values[0], 1.5);
    assert_eq!(values[1], -2000.0);
    assert!(values[2].is_infinite() && values[2] > 0.0);
    assert!(values[3].is_infinite() && values[3] < 0.0);
    let nan: f64 = Deserializer::default().deserialize_into(".nan\n", &TypeDescriptor::f64())?;
    assert!(nan.is_nan());
    Ok(())
}

#[test]
fn booleans_follow_strictness() -> anyhow::Result<()> {
    let ty = TypeDescriptor::bool();
    assert_eq!(bind("true\n", &ty)?, Value::Bool(true));
    assert_eq!(bind("yes\n", &ty)?, Value::Bool(true));

    let strict = Deserializer::builder()
        .with_options(saphyr_bind::options! { strict_booleans: true })
        .build();
    assert!(strict.deserialize("yes\n", &ty).is_err());
    assert!(bind("definitely\n", &ty).is_err());
    Ok(())
}

#[test]
fn quoted_numbers_stay_strings() -> anyhow::Result<()> {
    assert_eq!(
        bind("'0042'\n", &TypeDescriptor::string())?,
        Value::String("0042".into())
    );
    assert_eq!(bind("0042\n", &TypeDescriptor::string())?, Value::String("0042".into()));
    Ok(())
}

#[test]
fn null_like_scalars_give_defaults() -> anyhow::Result<()> {
    assert_eq!(bind("~\n", &TypeDescriptor::i32())?, Value::Int(0));
    assert_eq!(bind("null\n", &TypeDescriptor::string())?, Value::String(String::new()));
    assert_eq!(
        bind("~\n", &TypeDescriptor::optional(TypeDescriptor::i32()))?,
        Value::Null
    );
    assert_eq!(
        bind("'~'\n", &TypeDescriptor::string())?,
        Value::String("~".into())
    );
    Ok(())
}

#[test]
fn timestamps_and_dates() -> anyhow::Result<()> {
    let stamp: chrono::DateTime<chrono::FixedOffset> = Deserializer::default().deserialize_into(
        "2024-03-05T10:20:30+02:00\n",
        &TypeDescriptor::scalar(ScalarKind::Timestamp),
    )?;
    assert_eq!(stamp.hour(), 10);
    assert_eq!(stamp.offset().local_minus_utc(), 7200);

    let date: NaiveDate = Deserializer::default()
        .deserialize_into("2024-03-05\n", &TypeDescriptor::scalar(ScalarKind::Date))?;
    assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 5));
    Ok(())
}

#[test]
fn binary_scalars_decode_base64() -> anyhow::Result<()> {
    let bytes = bind("!!binary aGVsbG8=\n", &TypeDescriptor::scalar(ScalarKind::Bytes))?;
    assert_eq!(bytes, Value::Bytes(b"hello".to_vec()));
    Ok(())
}

#[test]
fn enums_match_names_under_the_convention() -> anyhow::Result<()> {
    let deserializer = Deserializer::builder()
        .with_naming_convention(CamelCase)
        .with_enum(EnumDescriptor::new("DriveType", &["FrontWheel", "AllWheel"]))
        .build();
    let ty = TypeDescriptor::enumeration("DriveType");
    let variant: String = deserializer.deserialize_into("allWheel\n", &ty)?;
    assert_eq!(variant, "AllWheel");
    let variant: String = deserializer.deserialize_into("FRONTWHEEL\n", &ty)?;
    assert_eq!(variant, "FrontWheel");
    assert!(deserializer.deserialize("rearWheel\n", &ty).is_err());
    Ok(())
}

#[derive(Debug)]
struct DurationConverter;

impl ScalarConverter for DurationConverter {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        *target == TypeDescriptor::custom("Duration")
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        _ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        let (number, unit) = scalar.text.split_at(scalar.text.len().saturating_sub(1));
        let scale = match unit {
            "s" => 1,
            "m" => 60,
            "h" => 3600,
            _ => return Err(Error::scalar_conversion(scalar.text, target)),
        };
        number
            .parse::<u64>()
            .map(|n| Value::UInt(n * scale))
            .map_err(|_| Error::scalar_conversion(scalar.text, target))
    }
}

#[derive(Debug)]
struct ShoutingStrings;

impl ScalarConverter for ShoutingStrings {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        *target == TypeDescriptor::string()
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        _target: &TypeDescriptor,
        _ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        Ok(Value::String(scalar.text.to_uppercase()))
    }
}

#[test]
fn custom_converters_extend_and_override() -> anyhow::Result<()> {
    let deserializer = Deserializer::builder()
        .with_naming_convention(CamelCase)
        .with_scalar_converter(DurationConverter)
        .with_scalar_converter(ShoutingStrings)
        .with_object(
            ObjectDescriptor::new("Job")
                .member("Name", TypeDescriptor::string())
                .member("Timeout", TypeDescriptor::custom("Duration")),
        )
        .build();
    let bound =
        deserializer.deserialize("name: backup\ntimeout: 2m\n", &TypeDescriptor::object("Job"))?;
    let job = bound.root_object().expect("job");
    assert_eq!(job.get::<String>("Name")?, "BACKUP");
    assert_eq!(job.get::<u64>("Timeout")?, 120);

    let err = deserializer
        .deserialize("name: backup\ntimeout: soon\n", &TypeDescriptor::object("Job"))
        .unwrap_err();
    assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("timeout"));
    assert_eq!(err.location().map(|l| l.line()), Some(2));
    Ok(())
}

#[test]
fn custom_kind_without_converter_fails() {
    let err = bind("2m\n", &TypeDescriptor::custom("Duration")).unwrap_err();
    assert!(matches!(err.without_snippet(), Error::ScalarConversion { .. }));
}

#[test]
fn duplicate_keys_in_dictionaries() -> anyhow::Result<()> {
    let yaml = indoc! {"
        a: 1
        a: 2
    "};
    let ty = TypeDescriptor::dictionary(TypeDescriptor::i32());
    assert_eq!(
        bind(yaml, &ty)?,
        Value::Dictionary(vec![("a".into(), Value::Int(2))])
    );
    let first_wins = Deserializer::builder()
        .with_options(saphyr_bind::options! { duplicate_keys: DuplicateKeyPolicy::FirstWins })
        .build();
    assert_eq!(
        first_wins.deserialize(yaml, &ty)?.root,
        Value::Dictionary(vec![("a".into(), Value::Int(1))])
    );
    Ok(())
}
