//! 标题股票信息提取的边界用例。
//! 提取是纯函数：同一标题提取多少次，结果都一样。

use tdx_news::extract_stock_info;

#[test]
fn test_standard_announcement_title() {
    let info = extract_stock_info("蓝特光学(688127):2025年第二次临时股东大会决议公告");
    assert_eq!(info.stock_code.as_deref(), Some("688127"));
    assert_eq!(info.stock_name.as_deref(), Some("蓝特光学"));
}

#[test]
fn test_market_news_without_code() {
    // 宏观/市场类资讯没有关联个股，两个字段都为空，这不是错误
    let info = extract_stock_info("富国银行:AI牛市非泡沫 仍处早期阶段");
    assert_eq!(info.stock_code, None);
    assert_eq!(info.stock_name, None);
}

#[test]
fn test_fullwidth_separator_after_code() {
    let info = extract_stock_info("贵州茅台(600519)：关于回购公司股份的进展公告");
    assert_eq!(info.stock_code.as_deref(), Some("600519"));
    assert_eq!(info.stock_name.as_deref(), Some("贵州茅台"));
}

#[test]
fn test_code_not_six_digits() {
    assert_eq!(extract_stock_info("某公司(12345):公告"), Default::default());
    assert_eq!(extract_stock_info("某公司(1234567):公告"), Default::default());
    assert_eq!(extract_stock_info("某公司(A00001):公告"), Default::default());
}

#[test]
fn test_code_must_follow_leading_name_run() {
    // 代码括号必须紧跟标题开头那段非括号文字，埋在后面的不算
    let info = extract_stock_info("快讯(见内文)关联万科A(000002)的公告");
    assert_eq!(info.stock_code, None);
    assert_eq!(info.stock_name, None);
}

#[test]
fn test_name_is_trimmed() {
    let info = extract_stock_info(" 万科A (000002):关于股东权益变动的提示性公告");
    assert_eq!(info.stock_code.as_deref(), Some("000002"));
    assert_eq!(info.stock_name.as_deref(), Some("万科A"));
}

#[test]
fn test_empty_and_paren_only_titles() {
    assert_eq!(extract_stock_info(""), Default::default());
    assert_eq!(extract_stock_info("(600519)缺少名称"), Default::default());
}

#[test]
fn test_extraction_is_deterministic() {
    let title = "中国平安(601318):2025年半年度业绩报告";
    assert_eq!(extract_stock_info(title), extract_stock_info(title));
}
