/*
 * This file is a part of Vaultd
 * Vaultd is a free and open-source in-memory key-value store
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

use super::*;

fn roundtrip(value: Value) {
    let encoded = encode_to_vec(&value);
    let (decoded, consumed) = Parser::parse(&encoded).expect("value should decode");
    assert_eq!(consumed, encoded.len());
    assert_eq!(decoded, value);
}

#[test]
fn test_roundtrip_simple() {
    roundtrip(Value::Simple(b"OK".to_vec()));
}

#[test]
fn test_roundtrip_error() {
    roundtrip(Value::Error(b"WRONGTYPE".to_vec()));
}

#[test]
fn test_roundtrip_int() {
    roundtrip(Value::Int(-42));
    roundtrip(Value::Int(0));
}

#[test]
fn test_roundtrip_float() {
    roundtrip(Value::Float(3.25));
}

#[test]
fn test_roundtrip_whole_number_float_stays_a_float() {
    roundtrip(Value::Float(3.0));
    roundtrip(Value::Float(100.0));
    roundtrip(Value::Float(-0.0));
}

#[test]
fn test_roundtrip_bulk_null() {
    roundtrip(Value::Bulk(None));
}

#[test]
fn test_roundtrip_bulk_non_utf8() {
    // the codec must carry raw bytes outside UTF-8 verbatim
    roundtrip(Value::Bulk(Some(vec![0x80, 0x00, 0xff, b'\r', b'\n'])));
}

#[test]
fn test_roundtrip_array() {
    roundtrip(Value::Array(vec![
        Value::Bulk(Some(b"a".to_vec())),
        Value::Bulk(Some(b"b".to_vec())),
        Value::Int(7),
    ]));
}

#[test]
fn test_roundtrip_set() {
    roundtrip(Value::Set(vec![
        Value::Bulk(Some(b"x".to_vec())),
        Value::Bulk(Some(b"y".to_vec())),
    ]));
}

#[test]
fn test_roundtrip_map() {
    roundtrip(Value::Map(vec![(
        Value::Bulk(Some(b"k".to_vec())),
        Value::Bulk(Some(b"v".to_vec())),
    )]));
}

#[test]
fn test_roundtrip_nested_array() {
    roundtrip(Value::Array(vec![Value::Array(vec![Value::Int(1), Value::Int(2)])]));
}

#[test]
fn test_decode_int_with_dot_is_float() {
    let (value, _) = Parser::parse(b":3.14\r\n").unwrap();
    assert_eq!(value, Value::Float(3.14));
}

#[test]
fn test_decode_bulk_length_negative_one_is_null() {
    let (value, _) = Parser::parse(b"$-1\r\n").unwrap();
    assert_eq!(value, Value::Bulk(None));
}

#[test]
fn test_decode_not_enough() {
    assert_eq!(Parser::parse(b"$5\r\nhel"), Err(ParseError::NotEnough));
}

#[test]
fn test_decode_empty_is_empty_request() {
    assert_eq!(Parser::parse(b""), Err(ParseError::Empty));
}

#[test]
fn test_decode_unknown_tag_falls_back_to_inline() {
    let (value, consumed) = Parser::parse(b"PING\r\n").unwrap();
    assert_eq!(value, Value::Inline(b"PING".to_vec()));
    assert_eq!(consumed, 6);
}

#[test]
fn test_decode_malformed_length() {
    assert_eq!(Parser::parse(b"$abc\r\nxx\r\n"), Err(ParseError::Malformed));
}

#[test]
fn test_decode_array_of_bulk_strings_is_the_expected_request_shape() {
    let (value, _) = Parser::parse(b"*2\r\n$3\r\nGET\r\n$4\r\nkey1\r\n").unwrap();
    assert_eq!(
        value,
        Value::Array(vec![
            Value::Bulk(Some(b"GET".to_vec())),
            Value::Bulk(Some(b"key1".to_vec())),
        ])
    );
}
