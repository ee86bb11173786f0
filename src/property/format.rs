//! Human-readable rendering of property values.
//!
//! Best effort and name driven: a property whose name mentions "time" is
//! shown as a timestamp, one that mentions a size as pixels, and so on. The
//! raw values stay available on [`PropertyValue`](super::PropertyValue).

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::ids::{GlobalIdTable, ScopedId};

use super::{PropertySet, PropertyValue};

/// 100ns intervals per second.
const FILETIME_TICKS_PER_SECOND: u64 = 10_000_000;
/// Seconds from 1601-01-01 to 1970-01-01.
const FILETIME_UNIX_OFFSET: i64 = 11_644_473_600;
/// Seconds from 1970-01-01 to 1980-01-01, the Time32 epoch.
const TIME32_UNIX_OFFSET: i64 = 315_532_800;
/// Half-inch units at 96 dpi.
const PIXELS_PER_HALF_INCH: f32 = 48.0;

/// Render `value`, resolving compact ids through `table`. Fails only when an
/// id cannot be resolved.
pub fn format_value(name: &str, value: &PropertyValue, table: &GlobalIdTable) -> Result<String> {
    let lower = name.to_ascii_lowercase();
    Ok(match value {
        PropertyValue::NoData => String::new(),
        PropertyValue::Bool(b) => b.to_string(),
        PropertyValue::Blob(bytes) => format_blob(&lower, bytes),
        PropertyValue::U8(v) => v.to_string(),
        PropertyValue::U16(v) if lower.contains("langid") => format_lcid(*v as u32),
        PropertyValue::U16(v) => v.to_string(),
        PropertyValue::U32(v) => format_u32(&lower, *v),
        PropertyValue::U64(v) if lower.contains("time") => {
            filetime_to_string(*v).unwrap_or_else(|| v.to_string())
        }
        PropertyValue::U64(v) => v.to_string(),
        PropertyValue::Id(_, id) => format_id(id.as_ref(), table)?,
        PropertyValue::Ids(_, array) => {
            let mut parts = array
                .ids
                .iter()
                .map(|id| format_id(Some(id), table))
                .collect::<Result<Vec<_>>>()?;
            match array.absent {
                0 => {}
                1 => parts.push("absent".to_string()),
                n => parts.push(format!("absent ×{n}")),
            }
            format!("[{}]", parts.join(", "))
        }
        PropertyValue::PropertySet(set) => format_set(set, table)?,
    })
}

fn format_u32(lower: &str, v: u32) -> String {
    if lower.contains("time") {
        time32_to_string(v)
    } else if ["height", "width", "offset", "margin"].iter().any(|k| lower.contains(k)) {
        half_inch_to_pixels(f32::from_bits(v)).to_string()
    } else if lower.contains("languageid") {
        format_lcid(v)
    } else {
        v.to_string()
    }
}

fn format_blob(lower: &str, bytes: &[u8]) -> String {
    if lower.contains("guid") && bytes.len() == 16 {
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        return Uuid::from_bytes_le(raw).to_string();
    }
    if bytes.len() % 2 == 0 {
        let units: Vec<u16> = bytes.chunks_exact(2).map(LittleEndian::read_u16).collect();
        if let Ok(text) = String::from_utf16(&units) {
            return text.trim_end_matches('\0').to_string();
        }
    }
    hex::encode(bytes)
}

fn format_id(id: Option<&ScopedId>, table: &GlobalIdTable) -> Result<String> {
    match id {
        Some(id) => Ok(table.resolve_scoped(id)?.to_string()),
        None => Ok("absent".to_string()),
    }
}

fn format_set(set: &PropertySet, table: &GlobalIdTable) -> Result<String> {
    let parts = set
        .properties
        .iter()
        .map(|p| {
            let name = p.id.name();
            format_value(&name, &p.value, table).map(|v| format!("{name}: {v}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("{{{}}}", parts.join(", ")))
}

pub fn filetime_to_string(filetime: u64) -> Option<String> {
    let secs = (filetime / FILETIME_TICKS_PER_SECOND) as i64 - FILETIME_UNIX_OFFSET;
    let nanos = (filetime % FILETIME_TICKS_PER_SECOND) as u32 * 100;
    DateTime::<Utc>::from_timestamp(secs, nanos).map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
}

pub fn time32_to_string(time32: u32) -> String {
    DateTime::<Utc>::from_timestamp(TIME32_UNIX_OFFSET + time32 as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| time32.to_string())
}

pub fn half_inch_to_pixels(size: f32) -> i64 {
    (size * PIXELS_PER_HALF_INCH) as i64
}

fn format_lcid(lcid: u32) -> String {
    format!("{}({})", lcid_name(lcid).unwrap_or("Unknown LCID"), lcid)
}

/// Windows locale ids, by primary language.
pub fn lcid_name(lcid: u32) -> Option<&'static str> {
    Some(match lcid {
        0x0401 => "ar_SA", 0x0801 => "ar_IQ", 0x0C01 => "ar_EG", 0x1001 => "ar_LY",
        0x1401 => "ar_DZ", 0x1801 => "ar_MA", 0x1C01 => "ar_TN", 0x2001 => "ar_OM",
        0x2401 => "ar_YE", 0x2801 => "ar_SY", 0x2C01 => "ar_JO", 0x3001 => "ar_LB",
        0x3401 => "ar_KW", 0x3801 => "ar_AE", 0x3C01 => "ar_BH", 0x4001 => "ar_QA",
        0x0402 => "bg_BG",
        0x0403 => "ca_ES",
        0x0004 => "zh_CHS", 0x0404 => "zh_TW", 0x0804 => "zh_CN", 0x0C04 => "zh_HK",
        0x1004 => "zh_SG", 0x1404 => "zh_MO", 0x7C04 => "zh_CHT",
        0x0405 => "cs_CZ",
        0x0406 => "da_DK",
        0x0407 => "de_DE", 0x0807 => "de_CH", 0x0C07 => "de_AT", 0x1007 => "de_LU",
        0x1407 => "de_LI",
        0x0408 => "el_GR",
        0x0409 => "en_US", 0x0809 => "en_GB", 0x0C09 => "en_AU", 0x1009 => "en_CA",
        0x1409 => "en_NZ", 0x1809 => "en_IE", 0x1C09 => "en_ZA", 0x2009 => "en_JA",
        0x2409 => "en_CB", 0x2809 => "en_BZ", 0x2C09 => "en_TT", 0x3009 => "en_ZW",
        0x3409 => "en_PH", 0x4009 => "en_IN", 0x4409 => "en_MY", 0x4809 => "en_IN",
        0x040A => "es_ES", 0x080A => "es_MX", 0x0C0A => "es_ES", 0x100A => "es_GT",
        0x140A => "es_CR", 0x180A => "es_PA", 0x1C0A => "es_DO", 0x200A => "es_VE",
        0x240A => "es_CO", 0x280A => "es_PE", 0x2C0A => "es_AR", 0x300A => "es_EC",
        0x340A => "es_CL", 0x380A => "es_UR", 0x3C0A => "es_PY", 0x400A => "es_BO",
        0x440A => "es_SV", 0x480A => "es_HN", 0x4C0A => "es_NI", 0x500A => "es_PR",
        0x540A => "es_US",
        0x040B => "fi_FI",
        0x040C => "fr_FR", 0x080C => "fr_BE", 0x0C0C => "fr_CA", 0x100C => "fr_CH",
        0x140C => "fr_LU", 0x180C => "fr_MC",
        0x040D => "he_IL",
        0x040E => "hu_HU",
        0x040F => "is_IS",
        0x0410 => "it_IT", 0x0810 => "it_CH",
        0x0411 => "ja_JP",
        0x0412 => "ko_KR",
        0x0413 => "nl_NL", 0x0813 => "nl_BE",
        0x0414 => "nb_NO", 0x0814 => "nn_NO",
        0x0415 => "pl_PL",
        0x0416 => "pt_BR", 0x0816 => "pt_PT",
        0x0417 => "rm_CH",
        0x0418 => "ro_RO",
        0x0419 => "ru_RU",
        0x041A => "hr_HR", 0x081A => "sr_SP", 0x0C1A => "sr_SP", 0x101A => "hr_BA",
        0x141A => "bs_BA", 0x181A => "sr_BA", 0x1C1A => "sr_BA", 0x201A => "bs_BA",
        0x041B => "sk_SK",
        0x041C => "sq_AL",
        0x041D => "sv_SE", 0x081D => "sv_FI",
        0x041E => "th_TH",
        0x041F => "tr_TR",
        0x0420 => "ur_PK", 0x0820 => "ur_IN",
        0x0421 => "id_ID",
        0x0422 => "uk_UA",
        0x0423 => "be_BY",
        0x0424 => "sl_SI",
        0x0425 => "et_EE",
        0x0426 => "lv_LV",
        0x0427 => "lt_LT",
        0x0428 => "tg_TJ",
        0x0429 => "fa_IR",
        0x042A => "vi_VN",
        0x042B => "hy_AM",
        0x042C => "az_AZ", 0x082C => "az_AZ",
        0x042D => "eu_ES",
        0x042E => "wen_DE", 0x082E => "dsb_DE",
        0x042F => "mk_MK",
        0x0432 => "tn_ZA",
        0x0434 => "xh_ZA",
        0x0435 => "zu_ZA",
        0x0436 => "af_ZA",
        0x0437 => "ka_GE",
        0x0438 => "fo_FO",
        0x0439 => "hi_IN",
        0x043A => "mt_MT",
        0x043B => "se_NO", 0x083B => "se_SE", 0x0C3B => "se_FI", 0x103B => "smj_NO",
        0x143B => "smj_SE", 0x183B => "sma_NO", 0x1C3B => "sma_SE", 0x203B => "sms_FI",
        0x243B => "smn_FI",
        0x083C => "ga_IE",
        0x043E => "ms_MY", 0x083E => "ms_BN",
        0x043F => "kk_KZ",
        0x0440 => "ky_KG",
        0x0441 => "sw_KE",
        0x0442 => "tk_TM",
        0x0443 => "uz_UZ", 0x0843 => "uz_UZ",
        0x0444 => "tt_RU",
        0x0445 => "bn_IN",
        0x0446 => "pa_IN",
        0x0447 => "gu_IN",
        0x0448 => "or_IN",
        0x0449 => "ta_IN",
        0x044A => "te_IN",
        0x044B => "kn_IN",
        0x044C => "ml_IN",
        0x044D => "as_IN",
        0x044E => "mr_IN",
        0x044F => "sa_IN",
        0x0450 => "mn_MN", 0x0850 => "mn_CN",
        0x0451 => "bo_CN", 0x0851 => "bo_BT",
        0x0452 => "cy_GB",
        0x0453 => "kh_KH",
        0x0454 => "lo_LA",
        0x0456 => "gl_ES",
        0x0457 => "kok_IN",
        0x045A => "syr_SY",
        0x045B => "si_LK",
        0x045D => "iu_CA", 0x085D => "iu_CA",
        0x045E => "am_ET",
        0x085F => "tmz_DZ",
        0x0461 => "ne_NP",
        0x0462 => "fy_NL",
        0x0463 => "ps_AF",
        0x0464 => "fil_PH",
        0x0465 => "div_MV",
        0x0468 => "ha_NG",
        0x046A => "yo_NG",
        0x046B => "quz_BO", 0x086B => "quz_EC", 0x0C6B => "quz_PE",
        0x046C => "ns_ZA",
        0x046D => "ba_RU",
        0x046E => "lb_LU",
        0x046F => "kl_GL",
        0x0478 => "ii_CN",
        0x047A => "arn_CL",
        0x047C => "moh_CA",
        0x047E => "br_FR",
        0x0480 => "ug_CN",
        0x0481 => "mi_NZ",
        0x0482 => "oc_FR",
        0x0483 => "co_FR",
        0x0484 => "gsw_FR",
        0x0485 => "sah_RU",
        0x0486 => "qut_GT",
        0x0487 => "rw_RW",
        0x0488 => "wo_SN",
        0x048C => "gbz_AF",
        _ => return None,
    })
}
