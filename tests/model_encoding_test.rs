use std::sync::Arc;

use tiles_metadata_encoder::{
    config::EncoderConfig,
    data_structures::{
        features::PrimitiveFeatures,
        metadata::{ModelMetadata, PrimitiveMetadata, PropertyTable, PropertyTableProperty},
        model::{Model, Primitive},
        value::ComponentType,
    },
    encoding::{
        description::{
            FeatureIdSetDescription, FeaturesMetadataDescription, ModelMetadataDescription,
            PrimitiveFeaturesDescription, PropertyTableDescription,
            PropertyTablePropertyDescription, PropertyTextureDescription,
            PropertyTexturePropertyDescription,
        },
        model::{EncodedModel, EncodedModelMetadata, EncodedPrimitiveMetadata},
    },
};

use crate::common::test_utils::{
    MockTexture, MockUploader, buildings_table, climate_texture, image, scalar, soil_texture,
    texture_set,
};

mod common;

fn roads_table() -> PropertyTable {
    PropertyTable {
        name: None,
        class_name: "road".to_string(),
        count: 2,
        properties: vec![PropertyTableProperty::from_numbers(
            "lanes",
            scalar(ComponentType::Uint8),
            &[2u8, 4],
        )],
    }
}

fn table_description(name: &str, properties: &[&str]) -> PropertyTableDescription {
    PropertyTableDescription {
        name: name.to_string(),
        properties: properties
            .iter()
            .map(|p| PropertyTablePropertyDescription {
                name: p.to_string(),
                encoding: None,
            })
            .collect(),
    }
}

fn texture_description(name: &str, properties: &[&str]) -> PropertyTextureDescription {
    PropertyTextureDescription {
        name: name.to_string(),
        properties: properties
            .iter()
            .map(|p| PropertyTexturePropertyDescription {
                name: p.to_string(),
            })
            .collect(),
    }
}

fn metadata_description() -> ModelMetadataDescription {
    ModelMetadataDescription {
        property_tables: vec![
            table_description("road", &["lanes"]),
            table_description("bridges", &["span"]),
            table_description("buildings", &["height", "name"]),
        ],
        property_textures: vec![
            texture_description("soil", &["moisture"]),
            texture_description("climate", &["temperature", "humidity"]),
        ],
    }
}

fn model() -> Model {
    let img = image(0, 2, 2, 4);
    Model {
        name: "tile_0".to_string(),
        metadata: ModelMetadata {
            property_tables: vec![buildings_table(), roads_table()],
            property_textures: vec![climate_texture(&img), soil_texture(&img)],
        },
        primitives: vec![
            Primitive {
                features: PrimitiveFeatures {
                    feature_id_sets: vec![texture_set(&img, vec![3])],
                },
                metadata: PrimitiveMetadata {
                    property_texture_indices: vec![0],
                },
            },
            Primitive {
                features: PrimitiveFeatures::default(),
                metadata: PrimitiveMetadata {
                    property_texture_indices: vec![1, 0, 7],
                },
            },
        ],
    }
}

fn description() -> FeaturesMetadataDescription {
    FeaturesMetadataDescription {
        features: PrimitiveFeaturesDescription {
            feature_id_sets: vec![FeatureIdSetDescription {
                name: "_FEATURE_ID_TEXTURE_0".to_string(),
                kind: None,
                property_table_name: "buildings".to_string(),
            }],
        },
        metadata: metadata_description(),
    }
}

#[test]
fn should_encode_declared_tables_in_declaration_order_and_skip_absent_ones() {
    let model = model();
    let encoded: EncodedModelMetadata<MockTexture> = EncodedModelMetadata::encode_any_thread(
        &EncoderConfig::default(),
        &metadata_description(),
        &model.metadata,
    );

    let tables: Vec<&str> = encoded.property_tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tables, ["road", "buildings"]);
    let textures: Vec<&str> = encoded
        .property_textures
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(textures, ["soil", "climate"]);

    let buildings = encoded.property_table("buildings").unwrap();
    assert_eq!(buildings.properties[0].name, "PTABLE_buildingsheight");
    assert_eq!(buildings.properties[1].name, "PTABLE_buildingsname");
    assert!(encoded.property_table("bridges").is_none());
}

#[test]
fn should_share_property_texture_images_across_the_model() {
    let model = model();
    let mut encoded: EncodedModelMetadata<MockTexture> = EncodedModelMetadata::encode_any_thread(
        &EncoderConfig::default(),
        &metadata_description(),
        &model.metadata,
    );

    let uploader = MockUploader::new();
    assert!(encoded.encode_game_thread(&uploader));
    // Three table properties plus one shared image.
    assert_eq!(uploader.created(), 4);

    let soil = encoded.property_texture("soil").unwrap();
    let climate = encoded.property_texture("climate").unwrap();
    let moisture = soil.properties[0].texture.texture().unwrap();
    assert!(climate
        .properties
        .iter()
        .all(|p| Arc::ptr_eq(p.texture.texture().unwrap(), moisture)));

    encoded.destroy();
    assert_eq!(uploader.live(), 0);
}

#[test]
fn should_list_property_textures_used_by_a_primitive() {
    let model = model();
    let description = metadata_description();

    let first = EncodedPrimitiveMetadata::encode_any_thread(
        &description,
        &model.metadata,
        &model.primitives[0].metadata,
    );
    assert_eq!(first.property_texture_names, ["climate"]);

    // Names follow the description, unknown indices are ignored.
    let mut second = EncodedPrimitiveMetadata::encode_any_thread(
        &description,
        &model.metadata,
        &model.primitives[1].metadata,
    );
    assert_eq!(second.property_texture_names, ["soil", "climate"]);
    assert!(second.encode_game_thread());
    second.destroy();
    assert!(second.property_texture_names.is_empty());
}

#[test]
fn should_skip_undeclared_property_textures_of_a_primitive() {
    let model = model();
    let description = ModelMetadataDescription {
        property_tables: Vec::new(),
        property_textures: vec![texture_description("soil", &["moisture"])],
    };
    let encoded = EncodedPrimitiveMetadata::encode_any_thread(
        &description,
        &model.metadata,
        &model.primitives[0].metadata,
    );
    assert!(encoded.property_texture_names.is_empty());
}

#[test]
fn should_encode_and_destroy_a_whole_model() {
    let model = model();
    let mut encoded: EncodedModel<MockTexture> =
        EncodedModel::encode_any_thread(&EncoderConfig::default(), &description(), &model);

    assert_eq!(encoded.name, "tile_0");
    assert_eq!(encoded.primitives.len(), 2);
    let set = &encoded.primitives[0].features.feature_id_sets[0];
    assert_eq!(set.property_table_name, "buildings");
    assert!(encoded.primitives[1].features.feature_id_sets.is_empty());

    let uploader = MockUploader::new();
    assert!(encoded.encode_game_thread(&uploader));
    // Four metadata textures plus the primitive's own feature ID texture.
    assert_eq!(uploader.created(), 5);

    encoded.destroy();
    encoded.destroy();
    assert_eq!(uploader.live(), 0);
}

#[test]
fn should_not_leak_when_destroyed_before_game_thread() {
    let model = model();
    let mut encoded: EncodedModel<MockTexture> =
        EncodedModel::encode_any_thread(&EncoderConfig::default(), &description(), &model);
    encoded.destroy();

    let uploader = MockUploader::new();
    assert!(encoded.encode_game_thread(&uploader));
    assert_eq!(uploader.created(), 0);
}
