use tiles_metadata_encoder::{
    config::EncoderConfig,
    data_structures::{
        metadata::{
            PropertyTable, PropertyTableProperty, PropertyTablePropertyStatus, PropertyValueDetails,
        },
        value::{ComponentType, MetadataType, MetadataValue, Number, ValueType},
    },
    encoding::{
        description::{PropertyTableDescription, PropertyTablePropertyDescription},
        details::{
            EncodedComponentType, EncodedConversion, EncodedType, MetadataEncodingDetails,
        },
        property_table::{EncodedPropertyTable, texture_dimensions},
    },
};

use crate::common::test_utils::{MockTexture, MockUploader, buildings_table, f32_at, scalar};

mod common;

fn table(properties: Vec<PropertyTableProperty>) -> PropertyTable {
    PropertyTable {
        name: Some("t".to_string()),
        class_name: String::new(),
        count: properties.first().map_or(0, |p| p.size),
        properties,
    }
}

fn declare(properties: &[(&str, Option<MetadataEncodingDetails>)]) -> PropertyTableDescription {
    PropertyTableDescription {
        name: "t".to_string(),
        properties: properties
            .iter()
            .map(|(name, encoding)| PropertyTablePropertyDescription {
                name: name.to_string(),
                encoding: *encoding,
            })
            .collect(),
    }
}

fn encode(
    description: &PropertyTableDescription,
    table: &PropertyTable,
) -> EncodedPropertyTable<MockTexture> {
    EncodedPropertyTable::encode_any_thread(&EncoderConfig::default(), description, table)
}

#[test]
fn should_lay_out_values_row_major_from_origin() {
    let values: Vec<f32> = (0..10).map(|i| i as f32 * 1.5).collect();
    let source = table(vec![PropertyTableProperty::from_numbers(
        "v",
        scalar(ComponentType::Float32),
        &values,
    )]);
    let encoded = encode(&declare(&[("v", None)]), &source);

    let property = &encoded.properties[0];
    assert_eq!(property.stride, 1);
    let pixels = property.texture.pixels().unwrap();
    assert_eq!(pixels.format, wgpu::TextureFormat::R32Float);
    assert_eq!((pixels.width, pixels.height), (4, 3));
    assert!((pixels.width * pixels.height) as usize >= values.len());
    for (i, value) in values.iter().enumerate() {
        let (x, y) = (i as u32 % pixels.width, i as u32 / pixels.width);
        assert_eq!(f32_at(pixels, (y * pixels.width + x) as usize), *value);
    }
    assert_eq!(pixels.data.len(), 12 * 4);
}

#[test]
fn should_pick_smallest_square_ish_dimensions() {
    assert_eq!(texture_dimensions(0, 8192).unwrap(), (1, 1));
    assert_eq!(texture_dimensions(1, 8192).unwrap(), (1, 1));
    assert_eq!(texture_dimensions(9, 8192).unwrap(), (3, 3));
    assert_eq!(texture_dimensions(10, 8192).unwrap(), (4, 3));
    assert_eq!(texture_dimensions(9, 3).unwrap(), (3, 3));
    assert!(texture_dimensions(10, 3).is_err());
}

#[test]
fn should_skip_properties_that_do_not_fit_the_texture_limit() {
    let source = table(vec![PropertyTableProperty::from_numbers(
        "v",
        scalar(ComponentType::Uint8),
        &[1u8, 2, 3, 4, 5],
    )]);
    let config = EncoderConfig {
        max_texture_dimension: 2,
        ..EncoderConfig::default()
    };
    let encoded: EncodedPropertyTable<MockTexture> =
        EncodedPropertyTable::encode_any_thread(&config, &declare(&[("v", None)]), &source);
    assert!(encoded.properties.is_empty());
}

#[test]
fn should_truncate_strings_beyond_max_length() {
    let source = table(vec![PropertyTableProperty::from_strings(
        "label",
        &["HelloWorldXYZ", "Hi"],
    )]);
    let encoding = MetadataEncodingDetails::new(
        EncodedType::Scalar,
        EncodedComponentType::Uint8,
        EncodedConversion::Coerce,
    )
    .with_max_length(8);
    let encoded = encode(&declare(&[("label", Some(encoding))]), &source);

    let property = &encoded.properties[0];
    assert_eq!(property.stride, 8);
    let pixels = property.texture.pixels().unwrap();
    assert_eq!(pixels.format, wgpu::TextureFormat::R8Uint);
    assert_eq!(&pixels.data[..8], b"HelloWor");
    assert_eq!(&pixels.data[8..16], b"Hi\0\0\0\0\0\0");
}

#[test]
fn should_size_strings_by_longest_value_without_max_length() {
    let encoded = encode(&declare(&[("name", None)]), &buildings_table());

    let property = &encoded.properties[0];
    assert_eq!(property.stride, "Town Hall".len() as u32);
    let pixels = property.texture.pixels().unwrap();
    let stride = property.stride as usize;
    assert_eq!(&pixels.data[..stride], b"Town Hall");
    assert_eq!(&pixels.data[stride..stride + 5], b"Tower");
    assert_eq!(&pixels.data[2 * stride..2 * stride + 4], b"Shed");
}

#[test]
fn should_keep_uint8_and_widen_other_numbers_to_float() {
    let source = table(vec![
        PropertyTableProperty::from_numbers("small", scalar(ComponentType::Uint8), &[7u8, 9]),
        PropertyTableProperty::from_numbers(
            "big",
            scalar(ComponentType::Int64),
            &[1i64 << 40, -3],
        ),
    ]);
    let encoded = encode(&declare(&[("small", None), ("big", None)]), &source);

    let small = &encoded.properties[0];
    assert_eq!(small.encoding.component_type, EncodedComponentType::Uint8);
    assert_eq!(&small.texture.pixels().unwrap().data[..2], &[7, 9]);

    let big = &encoded.properties[1];
    assert_eq!(big.encoding.component_type, EncodedComponentType::Float);
    let pixels = big.texture.pixels().unwrap();
    assert_eq!(pixels.format, wgpu::TextureFormat::R32Float);
    assert_eq!(f32_at(pixels, 0), (1i64 << 40) as f32);
    assert_eq!(f32_at(pixels, 1), -3.0);
}

#[test]
fn should_expand_packed_booleans_to_one_byte_each() {
    let source = table(vec![PropertyTableProperty::from_booleans(
        "flag",
        &[true, false, true],
    )]);
    let encoded = encode(&declare(&[("flag", None)]), &source);
    let pixels = encoded.properties[0].texture.pixels().unwrap();
    assert_eq!(pixels.format, wgpu::TextureFormat::R8Uint);
    assert_eq!(pixels.data, vec![1, 0, 1, 0]);
}

#[test]
fn should_pad_vec3_to_four_channels() {
    let source = table(vec![PropertyTableProperty::from_numbers(
        "position",
        ValueType::new(MetadataType::Vec3, Some(ComponentType::Float32)),
        &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0],
    )]);
    let encoded = encode(&declare(&[("position", None)]), &source);
    let pixels = encoded.properties[0].texture.pixels().unwrap();
    assert_eq!(pixels.format, wgpu::TextureFormat::Rgba32Float);
    let floats: Vec<f32> = (0..8).map(|i| f32_at(pixels, i)).collect();
    assert_eq!(floats, [1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0]);
}

#[test]
fn should_encode_fixed_length_arrays_with_one_texel_per_element() {
    let property = PropertyTableProperty::new(
        "a",
        ValueType::array_of(MetadataType::Scalar, Some(ComponentType::Uint8)),
        2,
        vec![1, 2, 3, 4, 5, 6],
    )
    .with_array_count(3);
    let encoded = encode(&declare(&[("a", None)]), &table(vec![property]));

    let property = &encoded.properties[0];
    assert_eq!(property.stride, 3);
    assert_eq!(property.stride_parameter_name(), "PTABLE_ta_STRIDE");
    assert_eq!(property.texture.pixels().unwrap().data, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn should_pad_variable_length_arrays_to_longest() {
    let property = PropertyTableProperty::new(
        "a",
        ValueType::array_of(MetadataType::Scalar, Some(ComponentType::Uint8)),
        2,
        vec![1, 2, 3, 4, 5],
    )
    .with_array_offsets(vec![0, 2, 5]);
    let encoded = encode(&declare(&[("a", None)]), &table(vec![property]));

    let property = &encoded.properties[0];
    assert_eq!(property.stride, 3);
    assert_eq!(property.texture.pixels().unwrap().data, vec![1, 2, 0, 3, 4, 5]);
}

#[test]
fn should_coerce_out_of_range_values_to_zero_for_uint8() {
    let source = table(vec![PropertyTableProperty::from_numbers(
        "v",
        scalar(ComponentType::Int16),
        &[-5i16, 300, 42],
    )]);
    let encoding = MetadataEncodingDetails::new(
        EncodedType::Scalar,
        EncodedComponentType::Uint8,
        EncodedConversion::Coerce,
    );
    let encoded = encode(&declare(&[("v", Some(encoding))]), &source);
    assert_eq!(
        encoded.properties[0].texture.pixels().unwrap().data,
        vec![0, 0, 42, 0]
    );
}

#[test]
fn should_parse_colors_from_strings() {
    let source = table(vec![PropertyTableProperty::from_strings(
        "color",
        &["#ff0000", "rgb(0, 255, 0)"],
    )]);
    let encoding = MetadataEncodingDetails::new(
        EncodedType::Vec4,
        EncodedComponentType::Uint8,
        EncodedConversion::ParseColorFromString,
    );
    let encoded = encode(&declare(&[("color", Some(encoding))]), &source);
    let pixels = encoded.properties[0].texture.pixels().unwrap();
    assert_eq!(pixels.format, wgpu::TextureFormat::Rgba8Uint);
    assert_eq!(pixels.data, vec![255, 0, 0, 255, 0, 255, 0, 255]);
}

#[test]
fn should_skip_missing_invalid_and_unencoded_properties() {
    let mut broken =
        PropertyTableProperty::from_numbers("broken", scalar(ComponentType::Float32), &[1.0f32]);
    broken.size = 10;
    let matrix = PropertyTableProperty::from_numbers(
        "matrix",
        ValueType::new(MetadataType::Mat2, Some(ComponentType::Float32)),
        &[1.0f32, 0.0, 0.0, 1.0],
    );
    let plain = PropertyTableProperty::from_numbers("plain", scalar(ComponentType::Uint8), &[1u8]);
    let mut skipped = plain.clone();
    skipped.name = "skipped".to_string();
    let source = table(vec![plain, broken, matrix, skipped]);

    let description = declare(&[
        ("absent", None),
        ("broken", None),
        ("matrix", None),
        ("skipped", Some(MetadataEncodingDetails::default())),
        ("plain", None),
    ]);
    let encoded = encode(&description, &source);

    let names: Vec<&str> = encoded.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["PTABLE_tplain"]);
}

#[test]
fn should_copy_side_values_verbatim() {
    let details = PropertyValueDetails {
        offset: Some(MetadataValue::Number(Number::Float(1.5))),
        scale: Some(MetadataValue::Number(Number::Float(0.25))),
        no_data: Some(MetadataValue::Number(Number::Float(-9999.0))),
        default_value: Some(MetadataValue::Number(Number::Float(0.0))),
    };
    let mut source = buildings_table();
    source.properties[0] = source.properties[0].clone().with_details(details.clone());
    let description = PropertyTableDescription {
        name: "buildings".to_string(),
        properties: vec![PropertyTablePropertyDescription {
            name: "height".to_string(),
            encoding: None,
        }],
    };
    let encoded = encode(&description, &source);

    let height = &encoded.properties[0];
    assert_eq!(height.offset, details.offset);
    assert_eq!(height.scale, details.scale);
    assert_eq!(height.no_data, details.no_data);
    assert_eq!(height.default_value, details.default_value);
    // Values are stored raw; the shader applies offset and scale.
    assert_eq!(f32_at(height.texture.pixels().unwrap(), 0), 12.5);
}

#[test]
fn should_upload_each_property_and_isolate_failures() {
    let description = PropertyTableDescription {
        name: "buildings".to_string(),
        properties: vec![
            PropertyTablePropertyDescription {
                name: "height".to_string(),
                encoding: None,
            },
            PropertyTablePropertyDescription {
                name: "name".to_string(),
                encoding: None,
            },
        ],
    };
    let mut encoded = encode(&description, &buildings_table());

    let uploader = MockUploader::failing(&["PTABLE_buildingsheight"]);
    assert!(!encoded.encode_game_thread(&uploader));
    assert!(encoded.properties[0].texture.is_pending());
    assert!(encoded.properties[1].texture.texture().is_some());
    assert_eq!(uploader.labels(), ["PTABLE_buildingsname"]);

    encoded.destroy();
    encoded.destroy();
    assert_eq!(uploader.live(), 0);
}

#[test]
fn should_skip_columns_whose_row_count_differs_from_table() {
    let short = PropertyTableProperty::from_numbers(
        "short",
        scalar(ComponentType::Float32),
        &[1.0f32, 2.0, 3.0],
    );
    let source = PropertyTable {
        name: Some("t".to_string()),
        class_name: String::new(),
        count: 10,
        properties: vec![short.clone()],
    };
    assert_eq!(
        source.property_status(&short),
        PropertyTablePropertyStatus::ErrorInvalidPropertyData
    );
    assert_eq!(short.status(), PropertyTablePropertyStatus::Valid);

    let encoded = encode(&declare(&[("short", None)]), &source);
    assert!(encoded.properties.is_empty());
}

#[test]
fn should_refuse_matrix_even_with_explicit_encoding() {
    let matrix = PropertyTableProperty::from_numbers(
        "m",
        ValueType::new(MetadataType::Mat3, Some(ComponentType::Float32)),
        &[1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    );
    let names = PropertyTableProperty::new(
        "names",
        ValueType::array_of(MetadataType::String, None),
        1,
        b"ab".to_vec(),
    )
    .with_array_count(2)
    .with_string_offsets(vec![0, 1, 2]);
    let source = table(vec![matrix, names]);
    let vec4 = MetadataEncodingDetails::new(
        EncodedType::Vec4,
        EncodedComponentType::Float,
        EncodedConversion::Coerce,
    );
    let bytes = MetadataEncodingDetails::new(
        EncodedType::Scalar,
        EncodedComponentType::Uint8,
        EncodedConversion::Coerce,
    );

    let encoded = encode(&declare(&[("m", Some(vec4)), ("names", Some(bytes))]), &source);
    assert!(encoded.properties.is_empty());
}
