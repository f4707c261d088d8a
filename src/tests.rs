#[cfg(test)]
mod tests {
    use crate::config::{Config, StorageBackend};

    fn test_config() -> Config {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;
        config.storage.public_url = "https://cdn.example.com".to_string();
        config.upload.key = Some("letmein".to_string());
        config
    }

    mod auth_tests {
        use super::test_config;
        use crate::config::UploadConfig;
        use crate::services::auth::{generate_media_id, validate_upload_key};

        #[test]
        fn test_validate_upload_key_matches() {
            let config = test_config();
            assert!(validate_upload_key(&config.upload, "letmein"));
        }

        #[test]
        fn test_validate_upload_key_mismatch() {
            let config = test_config();
            assert!(!validate_upload_key(&config.upload, "letmeout"));
            assert!(!validate_upload_key(&config.upload, "LETMEIN"));
            assert!(!validate_upload_key(&config.upload, ""));
        }

        #[test]
        fn test_validate_upload_key_fails_closed_without_secret() {
            let config = UploadConfig::default();
            assert!(!validate_upload_key(&config, ""));
            assert!(!validate_upload_key(&config, "anything"));
        }

        #[test]
        fn test_validate_upload_key_rejects_blank_secret() {
            let config = UploadConfig {
                key: Some(String::new()),
                ..UploadConfig::default()
            };
            assert!(!validate_upload_key(&config, ""));
        }

        #[test]
        fn test_generate_media_id_format() {
            let id = generate_media_id();
            let rest = id.strip_prefix("img_").expect("id should start with img_");
            let (millis, suffix) = rest.split_once('_').expect("id should have a suffix");
            assert!(millis.parse::<i64>().is_ok());
            assert_eq!(suffix.len(), 11);
            assert!(suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        }

        #[test]
        fn test_generate_media_id_unique() {
            let a = generate_media_id();
            let b = generate_media_id();
            assert_ne!(a, b);
        }
    }

    mod content_type_tests {
        use crate::services::media::content_type_for_key;

        #[test]
        fn test_known_extensions() {
            assert_eq!(content_type_for_key("a.jpg"), "image/jpeg");
            assert_eq!(content_type_for_key("a.jpeg"), "image/jpeg");
            assert_eq!(content_type_for_key("a.png"), "image/png");
            assert_eq!(content_type_for_key("a.gif"), "image/gif");
            assert_eq!(content_type_for_key("a.webp"), "image/webp");
            assert_eq!(content_type_for_key("a.mp4"), "video/mp4");
            assert_eq!(content_type_for_key("a.webm"), "video/webm");
        }

        #[test]
        fn test_extension_is_case_insensitive() {
            assert_eq!(content_type_for_key("HOLIDAY.JPG"), "image/jpeg");
            assert_eq!(content_type_for_key("clip.WebM"), "video/webm");
        }

        #[test]
        fn test_unknown_or_missing_extension() {
            assert_eq!(content_type_for_key("notes.txt"), "application/octet-stream");
            assert_eq!(content_type_for_key("README"), "application/octet-stream");
            assert_eq!(content_type_for_key("backup.png.gz"), "application/octet-stream");
        }

        #[test]
        fn test_only_final_extension_counts() {
            assert_eq!(content_type_for_key("img_1_abc.tar.png"), "image/png");
        }
    }

    mod upload_validation_tests {
        use crate::services::media::{storage_key_for, validate_upload, MediaError, UploadedFile};
        use bytes::Bytes;

        const MAX: usize = 50 * 1024 * 1024;

        fn file(name: &str, content_type: Option<&str>, len: usize) -> UploadedFile {
            UploadedFile {
                file_name: name.to_string(),
                content_type: content_type.map(str::to_string),
                data: Bytes::from(vec![0u8; len]),
            }
        }

        #[test]
        fn test_allowed_types_pass() {
            for mime in [
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/webp",
                "video/mp4",
                "video/webm",
            ] {
                let f = file("x", Some(mime), 10);
                assert_eq!(validate_upload(&f, MAX).unwrap(), mime);
            }
        }

        #[test]
        fn test_disallowed_type_rejected() {
            let f = file("doc.pdf", Some("application/pdf"), 10);
            let err = validate_upload(&f, MAX).unwrap_err();
            assert!(matches!(err, MediaError::DisallowedType { ref mime_type } if mime_type == "application/pdf"));
            assert_eq!(
                err.to_string(),
                "Invalid file type. Only images and videos (MP4, WebM) are allowed."
            );
        }

        #[test]
        fn test_svg_is_not_allowed() {
            let f = file("logo.svg", Some("image/svg+xml"), 10);
            assert!(validate_upload(&f, MAX).is_err());
        }

        #[test]
        fn test_content_type_parameters_ignored() {
            let f = file("a.png", Some("Image/PNG; charset=binary"), 10);
            assert_eq!(validate_upload(&f, MAX).unwrap(), "image/png");
        }

        #[test]
        fn test_missing_content_type_guessed_from_name() {
            let f = file("clip.mp4", None, 10);
            assert_eq!(validate_upload(&f, MAX).unwrap(), "video/mp4");

            let f = file("mystery", None, 10);
            assert!(matches!(
                validate_upload(&f, MAX),
                Err(MediaError::DisallowedType { .. })
            ));
        }

        #[test]
        fn test_size_limit_is_inclusive() {
            let at_limit = file("a.png", Some("image/png"), 1024);
            assert!(validate_upload(&at_limit, 1024).is_ok());

            let over = file("a.png", Some("image/png"), 1025);
            let err = validate_upload(&over, 1024).unwrap_err();
            assert!(matches!(err, MediaError::TooLarge { size: 1025, max_bytes: 1024 }));
        }

        #[test]
        fn test_too_large_message_names_megabytes() {
            let err = MediaError::TooLarge {
                size: MAX + 1,
                max_bytes: MAX,
            };
            assert_eq!(err.to_string(), "File too large. Maximum size is 50MB.");
        }

        #[test]
        fn test_storage_key_keeps_original_extension() {
            assert_eq!(storage_key_for("img_1_a", "cat.png", "image/png"), "img_1_a.png");
            assert_eq!(storage_key_for("img_1_a", "Cat.JPG", "image/jpeg"), "img_1_a.JPG");
        }

        #[test]
        fn test_storage_key_falls_back_to_mime_extension() {
            assert_eq!(storage_key_for("img_1_a", "cat", "image/png"), "img_1_a.png");
            assert_eq!(storage_key_for("img_1_a", "movie.m p4", "video/mp4"), "img_1_a.mp4");
            assert_eq!(storage_key_for("img_1_a", "", "video/webm"), "img_1_a.webm");
        }
    }

    mod listing_tests {
        use crate::services::media::media_from_objects;
        use crate::storage::StoredObject;
        use chrono::{TimeZone, Utc};

        fn object(key: &str, size: Option<u64>, minute: Option<u32>) -> StoredObject {
            StoredObject {
                key: key.to_string(),
                size,
                last_modified: minute.map(|m| Utc.with_ymd_and_hms(2024, 5, 1, 12, m, 0).unwrap()),
            }
        }

        #[test]
        fn test_folder_markers_dropped() {
            let now = Utc::now();
            let items = media_from_objects(
                vec![
                    object("albums/", Some(0), Some(1)),
                    object("a.png", Some(3), Some(2)),
                    object("albums/nested/", None, None),
                ],
                "https://cdn.example.com",
                now,
            );
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].id, "a.png");
        }

        #[test]
        fn test_sorted_newest_first() {
            let now = Utc::now();
            let items = media_from_objects(
                vec![
                    object("a.png", Some(1), Some(5)),
                    object("b.png", Some(1), Some(30)),
                    object("c.mp4", Some(1), Some(10)),
                ],
                "https://cdn.example.com",
                now,
            );
            let keys: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
            assert_eq!(keys, vec!["b.png", "c.mp4", "a.png"]);
            for pair in items.windows(2) {
                assert!(pair[0].uploaded_at >= pair[1].uploaded_at);
            }
        }

        #[test]
        fn test_item_fields_derived_from_key() {
            let now = Utc::now();
            let items = media_from_objects(
                vec![object("img_1_abc.webm", Some(2048), Some(0))],
                "https://cdn.example.com",
                now,
            );
            let item = &items[0];
            assert_eq!(item.filename, "img_1_abc.webm");
            assert_eq!(item.original_name, "img_1_abc.webm");
            assert_eq!(item.url, "https://cdn.example.com/img_1_abc.webm");
            assert_eq!(item.size, 2048);
            assert_eq!(item.content_type, "video/webm");
        }

        #[test]
        fn test_missing_size_and_timestamp_defaults() {
            let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
            let items = media_from_objects(vec![object("a.gif", None, None)], "https://x", now);
            assert_eq!(items[0].size, 0);
            assert_eq!(items[0].uploaded_at, now);
        }

        #[test]
        fn test_empty_listing() {
            assert!(media_from_objects(Vec::new(), "https://x", Utc::now()).is_empty());
        }
    }

    mod media_item_tests {
        use crate::models::MediaItem;
        use chrono::{TimeZone, Utc};

        #[test]
        fn test_serializes_camel_case_with_millisecond_timestamp() {
            let item = MediaItem {
                id: "img_1_a".to_string(),
                filename: "img_1_a.png".to_string(),
                original_name: "cat.png".to_string(),
                url: "https://cdn.example.com/img_1_a.png".to_string(),
                uploaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
                size: 10240,
                content_type: "image/png".to_string(),
            };

            let value = serde_json::to_value(&item).unwrap();
            assert_eq!(value["originalName"], "cat.png");
            assert_eq!(value["contentType"], "image/png");
            assert_eq!(value["uploadedAt"], "2024-05-01T12:00:00.000Z");
            assert_eq!(value["size"], 10240);

            let back: MediaItem = serde_json::from_value(value).unwrap();
            assert_eq!(back, item);
        }
    }

    mod upload_service_tests {
        use super::test_config;
        use crate::services::media::{list_media, upload_media, MediaError, UploadedFile};
        use crate::storage::MemoryStore;
        use bytes::Bytes;

        fn png(name: &str, len: usize) -> UploadedFile {
            UploadedFile {
                file_name: name.to_string(),
                content_type: Some("image/png".to_string()),
                data: Bytes::from(vec![7u8; len]),
            }
        }

        #[tokio::test]
        async fn test_upload_cat_png() {
            let config = test_config();
            let store = MemoryStore::new();

            let item = upload_media(&store, &config, Some("letmein"), Some(png("cat.png", 10240)))
                .await
                .unwrap();

            assert_eq!(item.content_type, "image/png");
            assert_eq!(item.size, 10240);
            assert_eq!(item.original_name, "cat.png");
            assert_ne!(item.id, "cat.png");
            assert_eq!(item.filename, format!("{}.png", item.id));
            assert_eq!(item.url, format!("https://cdn.example.com/{}", item.filename));

            let metadata = store.metadata(&item.filename).unwrap();
            assert_eq!(metadata.get("originalName").map(String::as_str), Some("cat.png"));
            assert!(metadata.contains_key("uploadedAt"));

            let listed = list_media(&store, &config).await.unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].filename, item.filename);
            assert_eq!(listed[0].size, 10240);
            assert_eq!(listed[0].content_type, "image/png");
        }

        #[tokio::test]
        async fn test_bad_key_wins_over_bad_file() {
            let config = test_config();
            let store = MemoryStore::new();
            let pdf = UploadedFile {
                file_name: "doc.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                data: Bytes::from_static(b"%PDF"),
            };

            let err = upload_media(&store, &config, Some("nope"), Some(pdf)).await.unwrap_err();
            assert!(matches!(err, MediaError::InvalidKey));

            let err = upload_media(&store, &config, None, None).await.unwrap_err();
            assert!(matches!(err, MediaError::InvalidKey));
            assert!(store.is_empty());
        }

        #[tokio::test]
        async fn test_missing_file() {
            let config = test_config();
            let store = MemoryStore::new();
            let err = upload_media(&store, &config, Some("letmein"), None).await.unwrap_err();
            assert!(matches!(err, MediaError::NoFile));
        }

        #[tokio::test]
        async fn test_unconfigured_secret_refuses_everything() {
            let mut config = test_config();
            config.upload.key = None;
            let store = MemoryStore::new();
            let err = upload_media(&store, &config, Some(""), Some(png("a.png", 1)))
                .await
                .unwrap_err();
            assert!(matches!(err, MediaError::InvalidKey));
        }

        #[tokio::test]
        async fn test_non_ascii_name_encoded_in_metadata() {
            let config = test_config();
            let store = MemoryStore::new();
            let item = upload_media(&store, &config, Some("letmein"), Some(png("café.png", 4)))
                .await
                .unwrap();

            assert_eq!(item.original_name, "café.png");
            let metadata = store.metadata(&item.filename).unwrap();
            assert_eq!(metadata.get("originalName").map(String::as_str), Some("caf%C3%A9.png"));
        }
    }

    mod config_tests {
        use crate::config::{Config, StorageBackend, DEFAULT_MAX_UPLOAD_BYTES};
        use std::collections::HashMap;

        fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }

        #[test]
        fn test_defaults() {
            let config = Config::default();
            assert_eq!(config.storage.backend, StorageBackend::S3);
            assert_eq!(config.storage.list_limit, 100);
            assert_eq!(config.storage.region, "auto");
            assert_eq!(config.upload.max_size_bytes, DEFAULT_MAX_UPLOAD_BYTES);
            assert!(config.upload.key.is_none());
            assert!(config.visits.webhook_url.is_none());
            assert_eq!(config.visits.geolocation_url, "http://ip-api.com/json");
        }

        #[test]
        fn test_env_overrides() {
            let vars = env(&[
                ("R2_ENDPOINT", "https://acct.r2.cloudflarestorage.com"),
                ("R2_ACCESS_KEY_ID", "AKIA"),
                ("R2_SECRET_ACCESS_KEY", "shh"),
                ("R2_BUCKET_NAME", "media"),
                ("R2_PUBLIC_URL", "https://pub.example.com/"),
                ("UPLOAD_KEY", "letmein"),
                ("DISCORD_WEBHOOK_URL", "https://hooks.example.com/x"),
            ]);
            let mut config = Config::default();
            config.apply_env(|name| vars.get(name).cloned());
            config.normalize();

            assert_eq!(config.storage.bucket.as_deref(), Some("media"));
            assert_eq!(config.storage.public_url, "https://pub.example.com");
            assert_eq!(config.upload.key.as_deref(), Some("letmein"));
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_empty_env_values_ignored() {
            let vars = env(&[("UPLOAD_KEY", "  "), ("DISCORD_WEBHOOK_URL", "")]);
            let mut config = Config::default();
            config.apply_env(|name| vars.get(name).cloned());
            assert!(config.upload.key.is_none());
            assert!(config.visits.webhook_url.is_none());
        }

        #[test]
        fn test_s3_backend_requires_bucket_settings() {
            let config = Config::default();
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains("R2_ENDPOINT"));
            assert!(err.contains("R2_BUCKET_NAME"));
            assert!(err.contains("R2_PUBLIC_URL"));
        }

        #[test]
        fn test_memory_backend_serves_under_media_path() {
            let mut config = Config::default();
            config.storage.backend = StorageBackend::Memory;
            config.normalize();
            assert_eq!(config.storage.public_url, "/media");
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_invalid_webhook_url_rejected() {
            let mut config = Config::default();
            config.storage.backend = StorageBackend::Memory;
            config.visits.webhook_url = Some("not a url".to_string());
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_parse_toml() {
            let config: Config = toml::from_str(
                r#"
                [site]
                title = "Night Shots"

                [server]
                port = 8080

                [storage]
                backend = "memory"
                list_limit = 25

                [upload]
                key = "letmein"
                "#,
            )
            .unwrap();

            assert_eq!(config.site.title, "Night Shots");
            assert_eq!(config.site.tagline, "Dark Gallery");
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.server.host, "127.0.0.1");
            assert_eq!(config.storage.backend, StorageBackend::Memory);
            assert_eq!(config.storage.list_limit, 25);
            assert_eq!(config.upload.max_size_bytes, 50 * 1024 * 1024);
        }

        #[test]
        fn test_debug_hides_secrets() {
            let mut config = Config::default();
            config.upload.key = Some("letmein".to_string());
            config.storage.secret_access_key = Some("shh-secret".to_string());
            let printed = format!("{:?}", config);
            assert!(!printed.contains("letmein"));
            assert!(!printed.contains("shh-secret"));
        }
    }

    mod visit_tests {
        use crate::models::{GeoLocation, Visit};
        use crate::services::visits::{build_embed, client_ip};
        use chrono::Utc;

        #[test]
        fn test_client_ip_first_forwarded_entry() {
            assert_eq!(client_ip(Some("203.0.113.7, 10.0.0.1")), "203.0.113.7");
            assert_eq!(client_ip(Some(" 198.51.100.2 ")), "198.51.100.2");
        }

        #[test]
        fn test_client_ip_fallback() {
            assert_eq!(client_ip(None), "127.0.0.1");
            assert_eq!(client_ip(Some("")), "127.0.0.1");
            assert_eq!(client_ip(Some(" , 10.0.0.1")), "127.0.0.1");
        }

        #[test]
        fn test_embed_with_full_geolocation() {
            let visit = Visit {
                ip: "203.0.113.7".to_string(),
                user_agent: Some("curl/8.0".to_string()),
            };
            let geo = GeoLocation {
                status: Some("success".to_string()),
                country: Some("Netherlands".to_string()),
                city: Some("Amsterdam".to_string()),
                isp: Some("Example ISP".to_string()),
                lat: Some(52.37),
                lon: Some(4.89),
            };

            let embed = build_embed(&visit, &geo, "Media Gallery", Utc::now());
            let names: Vec<_> = embed.fields.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(
                names,
                vec!["IP Address", "Country", "City", "ISP", "Latitude", "Longitude", "User Agent"]
            );
            assert_eq!(embed.fields[0].value, "`203.0.113.7`");
            assert_eq!(embed.fields[4].value, "52.37");
            assert!(embed.fields[0].inline);
            assert!(!embed.fields[6].inline);
            assert_eq!(embed.fields[6].value, "```curl/8.0```");
            assert_eq!(embed.color, 0x5865F2);
            assert_eq!(embed.footer.text, "Media Gallery");
        }

        #[test]
        fn test_embed_omits_missing_fields() {
            let visit = Visit {
                ip: "10.0.0.1".to_string(),
                user_agent: None,
            };
            let geo = GeoLocation {
                status: Some("fail".to_string()),
                city: Some("".to_string()),
                ..GeoLocation::default()
            };

            let embed = build_embed(&visit, &geo, "x", Utc::now());
            assert_eq!(embed.fields.len(), 1);
            assert_eq!(embed.fields[0].name, "IP Address");
        }

        #[test]
        fn test_geolocation_decodes_partial_payload() {
            let geo: GeoLocation =
                serde_json::from_str(r#"{"status":"success","country":"Japan","lat":35.68}"#).unwrap();
            assert_eq!(geo.country.as_deref(), Some("Japan"));
            assert_eq!(geo.lat, Some(35.68));
            assert!(geo.city.is_none());
            assert!(geo.lon.is_none());
        }
    }

    mod format_tests {
        use crate::web::format_file_size;

        #[test]
        fn test_format_file_size() {
            assert_eq!(format_file_size(0), "0 Bytes");
            assert_eq!(format_file_size(512), "512 Bytes");
            assert_eq!(format_file_size(1536), "1.5 KB");
            assert_eq!(format_file_size(10240), "10 KB");
            assert_eq!(format_file_size(50 * 1024 * 1024), "50 MB");
            assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
        }
    }
}
