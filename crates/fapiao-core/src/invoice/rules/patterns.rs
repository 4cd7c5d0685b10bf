//! Common regex patterns for Chinese VAT invoice extraction.
//!
//! Digits are spelled `[0-9]` rather than `\d` so full-width and other Unicode
//! digits never reach the decimal parser.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Invoice number (发票号码)
    pub static ref NUMBER_LABELED_20: Regex = Regex::new(
        r"发票号码[:：]?\s*([0-9]{20})"
    ).unwrap();

    pub static ref NUMBER_LABELED_SHORT: Regex = Regex::new(
        r"发票号码[:：]?\s*([0-9]{8,12})"
    ).unwrap();

    pub static ref NUMBER_SHORT_LABEL_20: Regex = Regex::new(
        r"号码[:：]?\s*([0-9]{20})"
    ).unwrap();

    pub static ref NUMBER_SHORT_LABEL_8: Regex = Regex::new(
        r"号码[:：]?\s*([0-9]{8})"
    ).unwrap();

    pub static ref NUMBER_NO_LABEL: Regex = Regex::new(
        r"(?i)No[:：.]?\s*([0-9]{8,20})"
    ).unwrap();

    // Invoice number occurrences used to split a page
    pub static ref SEGMENT_NUMBER_LABELED: Regex = Regex::new(
        r"(?:发票号码|号码)[:：]?\s*([0-9]{8,20})"
    ).unwrap();

    pub static ref SEGMENT_NUMBER_BARE_20: Regex = Regex::new(
        r"([0-9]{20})"
    ).unwrap();

    pub static ref SEGMENT_NUMBER_NO: Regex = Regex::new(
        r"(?:No|NO|no)[.:]?\s*([0-9]{8})"
    ).unwrap();

    // Taxpayer ID labels that must not be read as invoice numbers
    pub static ref TAX_ID_LABEL: Regex = Regex::new(
        r"纳税人识别号|统一社会信用代码"
    ).unwrap();

    // Invoice code (发票代码)
    pub static ref CODE_LABELED: Regex = Regex::new(
        r"发票代码[:：]?\s*([0-9]{10,12})"
    ).unwrap();

    pub static ref CODE_SHORT_LABEL: Regex = Regex::new(
        r"代码[:：]?\s*([0-9]{10,12})"
    ).unwrap();

    pub static ref CODE_BEFORE_LABEL: Regex = Regex::new(
        r"([0-9]{10,12})\s*发票代码"
    ).unwrap();

    // Issue date (开票日期): 2024年1月5日
    pub static ref DATE_CN: Regex = Regex::new(
        r"([0-9]{4})\s*年\s*([0-9]{1,2})\s*月\s*([0-9]{1,2})\s*日"
    ).unwrap();

    // Total amount (价税合计) cascade
    pub static ref TOTAL_WITH_LOWERCASE: Regex = Regex::new(
        r"价税合计(?s:.)*?小写.*?[¥￥:：]\s*([0-9,]+\.?[0-9]{0,2})"
    ).unwrap();

    pub static ref TOTAL_BRACKETED_LOWERCASE: Regex = Regex::new(
        r"[（(]小写[）)][:：]?\s*[¥￥]?\s*([0-9,]+\.?[0-9]{0,2})"
    ).unwrap();

    pub static ref TOTAL_LOWERCASE_YEN: Regex = Regex::new(
        r"小写[：:\s]*[¥￥]\s*([0-9,]+\.?[0-9]{0,2})"
    ).unwrap();

    pub static ref TOTAL_AFTER_UPPERCASE: Regex = Regex::new(
        r"价税合计[（(]大写[）)][^0-9]*[¥￥]?\s*([0-9,]+\.?[0-9]{0,2})"
    ).unwrap();

    pub static ref YEN_AMOUNT: Regex = Regex::new(
        r"[¥￥]\s*([0-9,]+\.[0-9]{2})"
    ).unwrap();

    pub static ref MONEY_TOKEN: Regex = Regex::new(
        r"[0-9,]+\.[0-9]{2}"
    ).unwrap();

    // Amount markers used to split a page
    pub static ref LOWERCASE_MARKER: Regex = Regex::new(
        r"[（(]小写[）)]"
    ).unwrap();

    pub static ref LOWERCASE_AMOUNT: Regex = Regex::new(
        r"[（(]?小写[）)]?[:：]?\s*[¥￥]?\s*([0-9,]+\.?[0-9]{0,2})"
    ).unwrap();

    // 合计 line: amount then tax
    pub static ref AMOUNT_AND_TAX: Regex = Regex::new(
        r"合\s*计\s+[¥￥]?\s*([0-9,]+\.?[0-9]{0,2})\s+[¥￥]?\s*([0-9,]+\.?[0-9]{0,2})"
    ).unwrap();

    // Party labels inside one layout column
    pub static ref NAME_LABEL: Regex = Regex::new(r"名称[:：]").unwrap();
    pub static ref BUYER_LABEL: Regex = Regex::new(r"购\s*买\s*方").unwrap();
    pub static ref SELLER_LABEL: Regex = Regex::new(r"销\s*售\s*方").unwrap();

    // Party names over full text
    pub static ref BUYER_SECTION_NAME: Regex = Regex::new(
        r"购\s*买\s*方(?s:.){0,50}?名\s*称[:：]?\s*([^\s统一社会]{2,50})"
    ).unwrap();
    pub static ref BUYER_NAME_INLINE: Regex = Regex::new(
        r"购买方名称[:：]?\s*(.+?)(?:\s|$|统一社会)"
    ).unwrap();
    pub static ref BUYER_SHORT: Regex = Regex::new(
        r"购\s*方[:：]?\s*(.+?)(?:\s|$|统一)"
    ).unwrap();
    pub static ref BUYER_NAME_SPACED: Regex = Regex::new(
        r"购买方\s*名称[:：]?\s*([^统一\s]{2,50})"
    ).unwrap();
    pub static ref BUYER_COMPANY: Regex = Regex::new(
        r"购买方(?s:.){0,30}?([^统一\s]*?有限公司[^统一\s]*)"
    ).unwrap();

    pub static ref SELLER_SECTION_NAME: Regex = Regex::new(
        r"销\s*售\s*方(?s:.){0,50}?名\s*称[:：]?\s*([^\s统一社会]{2,50})"
    ).unwrap();
    pub static ref SELLER_NAME_INLINE: Regex = Regex::new(
        r"销售方名称[:：]?\s*(.+?)(?:\s|$|统一社会)"
    ).unwrap();
    pub static ref SELLER_SHORT: Regex = Regex::new(
        r"销\s*方[:：]?\s*(.+?)(?:\s|$|统一)"
    ).unwrap();
    pub static ref SELLER_INLINE: Regex = Regex::new(
        r"销售方[:：]?\s*(.+?)(?:\s|$|统一)"
    ).unwrap();
    pub static ref SELLER_NAME_SPACED: Regex = Regex::new(
        r"销售方\s*名称[:：]?\s*([^统一\s]{2,50})"
    ).unwrap();
    pub static ref ANY_COMPANY_NAME: Regex = Regex::new(
        r"名称[:：]?\s*([^统一\s]*?有限公司[^统一\s]*)"
    ).unwrap();

    // Party names inside one segment of a multi-invoice page
    pub static ref BLOCK_SELLER_SECTION: Regex = Regex::new(
        r"销\s*售\s*方(?s:.){0,30}?名\s*称[:：]?\s*([^\s统一社会纳税人识别号]{2,50})"
    ).unwrap();
    pub static ref BLOCK_SELLER_INLINE: Regex = Regex::new(
        r"销售方名称[:：]?\s*([^\s统一]{2,50})"
    ).unwrap();
    pub static ref BLOCK_SELLER_SHORT: Regex = Regex::new(
        r"销\s*方[:：]?\s*([^\s统一]{2,50})"
    ).unwrap();
    pub static ref BLOCK_BUYER_SECTION: Regex = Regex::new(
        r"购\s*买\s*方(?s:.){0,30}?名\s*称[:：]?\s*([^\s统一社会纳税人识别号]{2,50})"
    ).unwrap();
    pub static ref BLOCK_BUYER_INLINE: Regex = Regex::new(
        r"购买方名称[:：]?\s*([^\s统一]{2,50})"
    ).unwrap();
    pub static ref BLOCK_BUYER_SHORT: Regex = Regex::new(
        r"购\s*方[:：]?\s*([^\s统一]{2,50})"
    ).unwrap();

    // Party name cleanup
    pub static ref NAME_TAIL: Regex = Regex::new(r"[:：\s（(].*").unwrap();
    pub static ref STAMP_MARKER: Regex = Regex::new(r"[（(]章[）)]?$").unwrap();
}
