// ==========================================
// 客户/商品 API 集成测试
// ==========================================
// 覆盖: 客户级联删除、权限门禁、商品删除保护、图片替换
// ==========================================


#[cfg(test)]
mod client_product_api_test {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use retail_orders::api::{
        ApiError, ClientNameQuery, ClientPatch, CreateOrderRequest, ErrorCategory, ImageUpload,
        NewClient, NewProduct, OrderItemInput, ProductPatch,
    };
    use retail_orders::app::{AppState, StaticIdentityProvider};
    use retail_orders::domain::types::OrderStatus;
    use retail_orders::engine::{FsImageStore, ReceiptPublisher};

    use crate::test_helpers::{create_test_db, open_connection, TestEnv};

    fn order(env: &TestEnv, client_id: i64, product_id: i64, quantity: i64) -> String {
        env.state
            .order_api
            .create_order(CreateOrderRequest {
                client_id,
                status: OrderStatus::Pending,
                items: vec![OrderItemInput {
                    product_id,
                    quantity,
                }],
            })
            .unwrap()
            .order
            .order
            .identifier
    }

    // ==========================================
    // 客户
    // ==========================================

    #[test]
    fn test_delete_client_cascades_orders_and_restores_stock() {
        let env = TestEnv::new();
        let ivan = env.add_client("Иван", "Петров", "");
        let anna = env.add_client("Анна", "Смирнова", "");
        let bread = env.add_product("Хлеб", 45.0, 20);

        let first = order(&env, ivan.id, bread.id, 3);
        let second = order(&env, ivan.id, bread.id, 4);
        let kept = order(&env, anna.id, bread.id, 5);
        assert_eq!(env.stock(bread.id), 8);

        let receipt = env.receipts_dir.path().join(format!("{}_receipt.txt", first));
        assert!(receipt.exists());

        let deleted = env.state.client_api.delete_client(ivan.id).unwrap();
        assert_eq!(deleted.id, ivan.id);

        assert_eq!(env.stock(bread.id), 15);
        assert!(env.state.lookup_api.get_client(ivan.id).unwrap().is_none());
        for identifier in [&first, &second] {
            assert!(env
                .state
                .lookup_api
                .get_order_by_identifier(identifier)
                .unwrap()
                .is_none());
        }
        assert!(!receipt.exists());
        assert!(env
            .state
            .lookup_api
            .get_order_by_identifier(&kept)
            .unwrap()
            .is_some());

        let recent = env.state.action_log_repo.find_recent(1).unwrap();
        assert_eq!(recent[0].action_type, "DeleteClient");
    }

    #[test]
    fn test_delete_client_by_name_and_missing_client() {
        let env = TestEnv::new();
        env.add_client("Olga", "Kuznetsova", "");

        let deleted = env
            .state
            .client_api
            .delete_client_by_name(ClientNameQuery::new(None, Some("kuznetsova")))
            .unwrap();
        assert_eq!(deleted.first_name, "Olga");

        let err = env
            .state
            .client_api
            .delete_client_by_name(ClientNameQuery::new(None, Some("Kuznetsova")))
            .unwrap_err();
        assert!(matches!(err, ApiError::ClientNotFound(_)));
        assert_eq!(err.category(), ErrorCategory::NotFound);

        let err = env
            .state
            .client_api
            .delete_client_by_name(ClientNameQuery::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[test]
    fn test_update_client_variants() {
        let env = TestEnv::new();
        let client = env.add_client("Иван", "Петров", "");

        let replaced = env
            .state
            .client_api
            .update_client(
                client.id,
                NewClient {
                    first_name: "Пётр".to_string(),
                    last_name: "Петров".to_string(),
                    birth_date: Some("1980-02-29".to_string()),
                    phone: "+7 900 000-00-00".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(replaced.first_name, "Пётр");
        assert!(replaced.birth_date.is_some());

        let patched = env
            .state
            .client_api
            .update_client_by_name(
                ClientNameQuery::new(Some("пётр"), None),
                ClientPatch {
                    address: Some("ул. Ленина, 1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(patched.address, "ул. Ленина, 1");
        assert_eq!(patched.phone, "+7 900 000-00-00");

        let err = env
            .state
            .client_api
            .update_client_by_name(ClientNameQuery::new(Some("Пётр"), None), ClientPatch::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let err = env
            .state
            .client_api
            .update_client(client.id + 1, NewClient {
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::ClientNotFound(_)));
    }

    // ==========================================
    // 权限门禁
    // ==========================================

    #[test]
    fn test_admin_operations_are_forbidden_for_users() {
        let env = TestEnv::with_identity(Arc::new(StaticIdentityProvider::user("clerk")));
        let client = env.add_client("Ivan", "Smith", "");
        let bread = env.add_product("Хлеб", 45.0, 10);
        order(&env, client.id, bread.id, 2);

        let err = env.state.client_api.delete_client(client.id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(err.category(), ErrorCategory::Forbidden);

        assert!(matches!(
            env.state.product_api.delete_product(bread.id),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            env.state.product_api.delete_product_by_name("Хлеб"),
            Err(ApiError::Forbidden(_))
        ));

        // 门禁拒绝时不产生任何变更
        assert_eq!(env.state.lookup_api.counts().unwrap(), (1, 1, 1));
        assert_eq!(env.stock(bread.id), 8);
    }

    #[test]
    fn test_anonymous_writes_are_attributed_to_system() {
        let env = TestEnv::with_identity(Arc::new(StaticIdentityProvider::anonymous()));
        let client = env.add_client("Ivan", "Smith", "");
        let bread = env.add_product("Хлеб", 45.0, 10);
        let identifier = order(&env, client.id, bread.id, 1);

        let history = env.state.order_api.order_history(&identifier).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].actor, "system");
    }

    // ==========================================
    // 商品
    // ==========================================

    #[test]
    fn test_product_delete_refused_while_referenced() {
        let env = TestEnv::new();
        let client = env.add_client("Ivan", "Smith", "");
        let bread = env.add_product("Хлеб", 45.0, 10);
        let identifier = order(&env, client.id, bread.id, 2);

        let err = env.state.product_api.delete_product(bread.id).unwrap_err();
        assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
        assert_eq!(err.category(), ErrorCategory::BadRequest);
        assert!(env.state.lookup_api.get_product(bread.id).unwrap().is_some());

        env.state.order_api.delete_order(&identifier).unwrap();
        let deleted = env.state.product_api.delete_product_by_name("хлеб").unwrap();
        assert_eq!(deleted.id, bread.id);
        assert!(env.state.lookup_api.get_product(bread.id).unwrap().is_none());

        assert!(matches!(
            env.state.product_api.delete_product(bread.id),
            Err(ApiError::ProductNotFound(_))
        ));
    }

    #[test]
    fn test_update_product_redefines_stock() {
        let env = TestEnv::new();
        let bread = env.add_product("Хлеб", 45.0, 10);

        let updated = env
            .state
            .product_api
            .update_product(
                bread.id,
                ProductPatch {
                    price: Some(50.0),
                    stock: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.price, 50.0);
        assert_eq!(env.stock(bread.id), 3);

        let renamed = env
            .state
            .product_api
            .update_product_by_name(
                "ХЛЕБ",
                ProductPatch {
                    name: Some("Батон".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "Батон");

        assert!(matches!(
            env.state
                .product_api
                .update_product_by_name("Батон", ProductPatch::default()),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            env.state.product_api.create_product(NewProduct {
                name: "Соль".to_string(),
                price: 10.0,
                stock: -1,
                image: None,
            }),
            Err(ApiError::ValidationError(_))
        ));
    }

    #[test]
    fn test_product_image_lifecycle() {
        let (_db_file, db_path) = create_test_db().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let conn = Arc::new(Mutex::new(open_connection(&db_path)));
        let state = AppState::from_parts(
            db_path,
            conn,
            Arc::new(StaticIdentityProvider::admin("root")),
            ReceiptPublisher::none(),
            Arc::new(FsImageStore::new(uploads.path())),
        );

        let product = state
            .product_api
            .create_product(NewProduct {
                name: "Сыр".to_string(),
                price: 320.0,
                stock: 5,
                image: Some(ImageUpload {
                    file_name: "cheese.png".to_string(),
                    bytes: b"old".to_vec(),
                }),
            })
            .unwrap();
        let old_path = product.image.clone().unwrap();
        assert!(Path::new(&old_path).exists());

        let product = state
            .product_api
            .replace_product_image(
                "сыр",
                ImageUpload {
                    file_name: "cheese_v2.png".to_string(),
                    bytes: b"new".to_vec(),
                },
            )
            .unwrap();
        let new_path = product.image.clone().unwrap();
        assert!(!Path::new(&old_path).exists());
        assert_eq!(std::fs::read(&new_path).unwrap(), b"new");

        // 商品不存在时不落盘
        let err = state
            .product_api
            .replace_product_image(
                "Молоко",
                ImageUpload {
                    file_name: "milk.png".to_string(),
                    bytes: b"x".to_vec(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::ProductNotFound(_)));
        assert!(!uploads.path().join("milk.png").exists());

        state.product_api.delete_product(product.id).unwrap();
        assert!(!Path::new(&new_path).exists());
    }
}
