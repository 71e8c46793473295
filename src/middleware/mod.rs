/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: 権限ごとの JWT 検証 layer / cors / http: 横断的な layer
 */
pub mod auth;
pub mod cors;
pub mod http;
