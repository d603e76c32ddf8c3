// ==========================================
// 查询 API 测试
// ==========================================


use retail_orders::api::{ApiError, CreateOrderRequest, OrderItemInput};
use retail_orders::config::config_keys;
use retail_orders::domain::types::OrderStatus;
use test_helpers::TestEnv;

fn seed(env: &TestEnv) -> (i64, i64) {
    let ivan = env.add_client("Иван", "Петров", "");
    env.add_client("Иван", "Сидоров", "");
    env.add_client("Анна", "Петрова", "");
    let juice = env.add_product("Сок яблочный", 120.0, 10);
    env.add_product("Сок апельсиновый", 130.0, 10);
    env.add_product("Хлеб", 45.0, 10);

    env.state
        .order_api
        .create_order(CreateOrderRequest {
            client_id: ivan.id,
            status: OrderStatus::Pending,
            items: vec![OrderItemInput {
                product_id: juice.id,
                quantity: 1,
            }],
        })
        .unwrap();
    (ivan.id, juice.id)
}

#[test]
fn test_lookup_by_key_and_identifier() {
    let env = TestEnv::new();
    let (ivan_id, _) = seed(&env);

    let orders = env.state.lookup_api.client_orders(ivan_id).unwrap();
    assert_eq!(orders.len(), 1);

    let by_id = env.state.lookup_api.get_order(orders[0].id).unwrap().unwrap();
    let by_identifier = env
        .state
        .lookup_api
        .get_order_by_identifier(&format!("  {}  ", orders[0].identifier.to_lowercase()))
        .unwrap()
        .unwrap();
    assert_eq!(by_id.order.id, by_identifier.order.id);
    assert_eq!(by_id.client.id, ivan_id);

    // 不存在返回 None，不报错
    assert!(env.state.lookup_api.get_order(9999).unwrap().is_none());
    assert!(env.state.lookup_api.get_client(9999).unwrap().is_none());
    assert!(env.state.lookup_api.client_orders(9999).unwrap().is_empty());
}

#[test]
fn test_search_clients_requires_criteria() {
    let env = TestEnv::new();
    seed(&env);

    assert_eq!(
        env.state
            .lookup_api
            .search_clients(Some("иван"), None)
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        env.state
            .lookup_api
            .search_clients(Some("Иван"), Some("Петров"))
            .unwrap()
            .len(),
        1
    );
    // 精确匹配: "Петров" 不匹配 "Петрова"
    assert_eq!(
        env.state
            .lookup_api
            .search_clients(None, Some("петров"))
            .unwrap()
            .len(),
        1
    );
    assert!(matches!(
        env.state.lookup_api.search_clients(None, Some("  ")),
        Err(ApiError::ValidationError(_))
    ));
}

#[test]
fn test_product_search() {
    let env = TestEnv::new();
    seed(&env);

    let found = env.state.lookup_api.search_products("СОК").unwrap();
    assert_eq!(found.len(), 2);
    assert!(env.state.lookup_api.search_products("молоко").unwrap().is_empty());
    assert!(matches!(
        env.state.lookup_api.search_products(""),
        Err(ApiError::ValidationError(_))
    ));

    let bread = env.state.lookup_api.find_product_by_name("хлеб").unwrap();
    assert_eq!(bread.unwrap().name, "Хлеб");
    assert!(env.state.lookup_api.find_product_by_name("Хле").unwrap().is_none());
}

#[test]
fn test_listing_pages_are_clamped_by_config() {
    let env = TestEnv::new();
    seed(&env);

    assert_eq!(env.state.lookup_api.list_clients(0, 0).unwrap().len(), 3);
    assert_eq!(env.state.lookup_api.list_clients(1, 10).unwrap().len(), 2);
    assert_eq!(env.state.lookup_api.list_clients(-5, 1).unwrap().len(), 1);

    env.state
        .config_manager
        .set_global_config_value(config_keys::PAGE_LIMIT_MAX, "2")
        .unwrap();
    assert_eq!(env.state.lookup_api.list_products(0, 50).unwrap().len(), 2);

    env.state
        .config_manager
        .set_global_config_value(config_keys::PAGE_LIMIT_DEFAULT, "1")
        .unwrap();
    assert_eq!(env.state.lookup_api.list_products(0, 0).unwrap().len(), 1);

    let orders = env.state.lookup_api.list_orders(0, 0).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].lines.len(), 1);

    assert_eq!(env.state.lookup_api.counts().unwrap(), (3, 3, 1));
}
