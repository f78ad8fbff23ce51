use anyhow::Result;
use grid_filter::config::GridConfig;
use grid_filter::evaluator::{Evaluator, Record};
use grid_filter::odata::{build_query_params, filter_to_odata, PageRequest};
use grid_filter::parser::parse_filter;
use grid_filter::selection::{reconcile, SelectAllGesture, SelectionTracker};
use grid_filter::sql::SqlFilterCompiler;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::{json, Value};

/// 加载网格配置，优先使用JSON配置文件，失败时使用默认配置
fn load_grid_config() -> GridConfig {
    match GridConfig::from_json_file("grid_config.json") {
        Ok(config) => {
            println!("✅ 成功从JSON配置文件加载网格配置");
            config
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用默认配置", e);
            GridConfig::default()
        }
    }
}

/// 模拟外部数据源已经解析好的记录集
///
/// 记录形状来自 Northwind 员工数据, FirstName 是多值别名字段
fn sample_records() -> Vec<Record> {
    let raw = json!([
        {
            "ID": 1, "LastName": "Davolio", "City": "Seattle",
            "Title": "Sales Representative",
            "FirstName": [
                { "fsname": "Janet", "name": "Janet", "nickname": "jane" },
                { "fsname": "Suzane", "name": "Suzane", "nickname": "suza" }
            ]
        },
        {
            "ID": 2, "LastName": "Fuller", "City": "Tacoma",
            "Title": "Vice President, Sales",
            "FirstName": [
                { "fsname": "Janet", "name": "Janet", "nickname": "jane" },
                { "fsname": "Margaret", "name": "Margaret", "nickname": "marg" },
                { "fsname": "Steven", "name": "Steven", "nickname": "stev" }
            ]
        },
        {
            "ID": 3, "LastName": "Leverling", "City": "Kirkland",
            "Title": "Sales Representative",
            "FirstName": [
                { "fsname": "Margaret", "name": "Margaret", "nickname": "marg" },
                { "fsname": "Michael", "name": "Michael", "nickname": "mich" }
            ]
        },
        {
            "ID": 4, "LastName": "Peacock", "City": "Redmond",
            "Title": "Sales Representative",
            "FirstName": [
                { "fsname": "Steven", "name": "Steven", "nickname": "stev" },
                { "fsname": "Michael", "name": "Michael", "nickname": "mich" },
                { "fsname": "Nan", "name": "Nancy", "nickname": "nanc" }
            ]
        },
        {
            "ID": 5, "LastName": "Buchanan", "City": "Kent",
            "Title": "Sales Manager",
            "FirstName": [
                { "fsname": "Michael", "name": "Michael", "nickname": "mich" },
                { "fsname": "Nan", "name": "Nancy", "nickname": "nanc" }
            ]
        },
        {
            "ID": 6, "LastName": "Suyama", "City": "Kent",
            "Title": "Sales Representative",
            "FirstName": [
                { "fsname": "Nan", "name": "Nancy", "nickname": "nanc" },
                { "fsname": "Janet", "name": "Janet", "nickname": "jane" }
            ]
        }
    ]);

    raw.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect()
        })
        .unwrap_or_default()
}

fn main() -> Result<()> {
    println!("--- Grid Filter: 过滤表达式求值与选中对账 ---");

    // 显示当前使用的网格配置
    println!("\n[配置信息]:");
    match GridConfig::from_json_file("grid_config.json") {
        Ok(config) => {
            println!("✅ 使用JSON配置文件: grid_config.json");
            println!("  主键字段: {}", config.key_field);
            println!("  每页行数: {}", config.page_size);
            for (field, tag) in &config.alias_fields {
                println!("  多值字段 {} -> 标签键 {}", field, tag);
            }
        }
        Err(e) => {
            println!("❌ JSON配置文件加载失败: {}", e);
            println!("⚠️ 将使用默认配置");
        }
    }

    let config = load_grid_config();
    let page_size = config.page_size;
    let evaluator = Evaluator::with_config(config);
    let records = sample_records();
    let total_count = records.len();
    println!("\n模拟记录集: {} 行", total_count);

    // 1. 示例过滤表达式 (UI 侧传来的嵌套数组文法)
    let raw_filter = json!([["City", "=", "Kent"], "or", ["FirstName", "=", "Margaret"]]);
    println!("\n[输入表达式]:\n{}\n", raw_filter);

    // 2. 语言边界：一次性构造带标签的表达式树
    println!("[步骤 1]: 解析为表达式树...");
    let node = match parse_filter(&raw_filter) {
        Ok(node) => {
            println!("✓ 成功解析表达式");
            println!("树结构: {:#?}", node);
            node
        }
        Err(e) => {
            println!("✗ 解析失败: {}", e.message);
            if let Some(path) = e.path {
                println!("  位置 {}", path);
            }
            return Ok(());
        }
    };

    // 3. 客户端求值 (本地模拟变体)
    println!("\n[步骤 2]: 客户端求值...");
    let result = evaluator.load(&records, &node, 0, page_size);
    println!("✓ 命中 {} / {} 行 (第 1 页):", result.rows.len(), result.total_count);
    for record in &result.rows {
        println!("  {}", Value::Object(record.clone()));
    }

    // 4. 远端委托变体：生成 OData 查询参数
    println!("\n[步骤 3]: 生成 OData 查询参数...");
    let page = PageRequest {
        page_index: 0,
        page_size,
    };
    for (name, value) in build_query_params(Some(&node), Some("City"), Some(page)) {
        println!("  {}={}", name, value);
    }

    // 5. 服务端翻译：编译为 SQL
    println!("\n[步骤 4]: 编译为 SQL...");
    let compiler = SqlFilterCompiler::new();
    match compiler.compile(&node, "Employee") {
        Ok(result) => {
            println!("✅ 成功编译为 SQL");
            println!("{}", result.sql);
            if !result.rewrites.is_empty() {
                println!("[应用的改写]:");
                for rewrite in &result.rewrites {
                    println!("• {:?}", rewrite);
                }
            }
        }
        Err(e) => {
            println!("✗ SQL 编译失败: {}", e.message);
        }
    }

    // 6. 选中对账演示
    demonstrate_selection(total_count);

    // 7. 交互模式
    run_repl(&evaluator, &records)
}

fn demonstrate_selection(total_count: usize) {
    println!("\n--- 选中对账演示 ---");
    let mut tracker = SelectionTracker::new();

    // 场景1：表头全选手势
    println!("\n[场景1]: 表头全选");
    let gesture = Some(SelectAllGesture {
        is_select_all: true,
    });
    let state = tracker.on_selection_changed(gesture, None, &[], total_count);
    println!("选中 {} / {} 行", state.selected_count, state.total_count);

    // 场景2：全选后取消两行, 网格上报带负向节点的 selectionFilter
    println!("\n[场景2]: 全选后取消 ID=3 和 ID=5");
    let selection_filter = parse_filter(&json!([
        ["!", ["ID", "=", 3]],
        ["!", ["ID", "=", 5]]
    ]));
    match selection_filter {
        Ok(filter) => {
            let state = tracker.on_selection_changed(None, Some(&filter), &[], total_count);
            println!("选中 {} / {} 行 (键列表不枚举)", state.selected_count, state.total_count);
        }
        Err(e) => println!("✗ 选中过滤解析失败: {}", e.message),
    }

    // 场景3：正向选中, 直接采用上报的键列表
    println!("\n[场景3]: 正向选中两行");
    let keys = vec![json!(2), json!(5)];
    match parse_filter(&json!([["ID", "=", 2], "or", ["ID", "=", 5]])) {
        Ok(filter) => {
            let state = reconcile(None, Some(&filter), &keys, total_count);
            println!("选中 {} 行, 键: {:?}", state.selected_count, state.selected_keys);
        }
        Err(e) => println!("✗ 选中过滤解析失败: {}", e.message),
    }
}

/// 交互模式：逐行输入 JSON 过滤表达式, 查看求值与查询参数输出
fn run_repl(evaluator: &Evaluator, records: &[Record]) -> Result<()> {
    println!("\n--- 交互模式 (输入 JSON 过滤表达式, exit 退出) ---");
    println!(r#"示例: [["City","=","Kent"],"or",["FirstName","=","Margaret"]]"#);

    let mut editor = DefaultEditor::new()?;
    let compiler = SqlFilterCompiler::new();

    loop {
        match editor.readline("filter> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }
                editor.add_history_entry(line).ok();

                let raw: Value = match serde_json::from_str(line) {
                    Ok(value) => value,
                    Err(e) => {
                        println!("✗ 不是合法的 JSON: {}", e);
                        continue;
                    }
                };

                match parse_filter(&raw) {
                    Ok(node) => {
                        let rows = evaluator.evaluate(records, &node);
                        println!("✓ 命中 {} / {} 行", rows.len(), records.len());
                        for record in &rows {
                            println!("  {}", Value::Object(record.clone()));
                        }
                        if let Some(clause) = filter_to_odata(&node) {
                            println!("$filter: {}", clause);
                        }
                        match compiler.compile(&node, "Employee") {
                            Ok(result) => println!("SQL: {}", result.sql),
                            Err(e) => println!("✗ SQL 编译失败: {}", e.message),
                        }
                    }
                    Err(e) => println!("✗ 解析失败: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
