//! The classic PDMS material color table.
//!
//! Group records carry a material index rather than a color. Indices 33..=64
//! repeat 1..=32; indices 206..=255 are the extended palette. Anything else
//! maps to black.

/// Looks up the 0xRRGGBB color for a material index.
pub fn material_rgb(index: u32) -> u32 {
    match index {
        1 | 33 => 0x000000,
        2 | 34 => 0xcc0000,
        3 | 35 => 0xed9900,
        4 | 36 => 0xcccc00,
        5 | 37 => 0x00cc00,
        6 | 38 => 0x00eded,
        7 | 39 => 0x0000cc,
        8 | 40 => 0xdd00dd,
        9 | 41 => 0xcc2b2b,
        10 | 42 => 0xffffff,
        11 | 43 => 0xf97f70,
        12 | 44 => 0xbfbfbf,
        13 | 45 => 0xa8a8a8,
        14 | 46 => 0x8c668c,
        15 | 47 => 0xf4f4f4,
        16 | 48 => 0x8e236b,
        17 | 49 => 0x00ff7f,
        18 | 50 => 0xf4ddb2,
        19 | 51 => 0xedc933,
        20 | 52 => 0x4775ff,
        21 | 53 => 0xede8aa,
        22 | 54 => 0xed1189,
        23 | 55 => 0x238e23,
        24 | 56 => 0xffa500,
        25 | 57 => 0xedede0,
        26 | 58 => 0xed7521,
        27 | 59 => 0x4782b5,
        28 | 60 => 0xffffff,
        29 | 61 => 0x2d2d4f,
        30 | 62 => 0x00007f,
        31 | 63 => 0xcc919e,
        32 | 64 => 0xcc5b44,
        206 => 0x000000,
        207 => 0xffffff,
        208 => 0xf4f4f4,
        209 => 0xedede0,
        210 => 0xa8a8a8,
        211 => 0xbfbfbf,
        212 => 0x518c8c,
        213 => 0x2d4f4f,
        214 => 0xcc0000,
        215 => 0xff0000,
        216 => 0xcc5b44,
        217 => 0xff6347,
        218 => 0x8c668c,
        219 => 0xed1189,
        220 => 0xcc919e,
        221 => 0xf97f70,
        222 => 0xed9900,
        223 => 0xffa500,
        224 => 0xff7f00,
        225 => 0x8e236b,
        226 => 0xcccc00,
        227 => 0xedc933,
        228 => 0xededd1,
        229 => 0xede8aa,
        230 => 0x99cc33,
        231 => 0x00ff7f,
        232 => 0x00cc00,
        233 => 0x238e23,
        234 => 0x2d4f2d,
        235 => 0x00eded,
        236 => 0x00bfcc,
        237 => 0x75edc6,
        238 => 0x0000cc,
        239 => 0x4775ff,
        240 => 0x00007f,
        241 => 0xafe0e5,
        242 => 0x2d2d4f,
        243 => 0x4782b5,
        244 => 0x330066,
        245 => 0x660099,
        246 => 0xed82ed,
        247 => 0xdd00dd,
        248 => 0xf4f4db,
        249 => 0xf4ddb2,
        250 => 0xdb9370,
        251 => 0xf4a55e,
        252 => 0xcc2b2b,
        253 => 0x9e9e5e,
        254 => 0xed7521,
        255 => 0x8c4414,
        _ => 0x000000,
    }
}

#[cfg(test)]
mod tests {
    use super::material_rgb;

    #[test]
    fn upper_half_repeats_lower() {
        for i in 1..=32 {
            assert_eq!(material_rgb(i), material_rgb(i + 32));
        }
    }

    #[test]
    fn unknown_indices_map_to_black() {
        assert_eq!(material_rgb(0), 0);
        assert_eq!(material_rgb(65), 0);
        assert_eq!(material_rgb(205), 0);
        assert_eq!(material_rgb(1000), 0);
    }

    #[test]
    fn extended_palette_present() {
        assert_eq!(material_rgb(215), 0xff0000);
        assert_eq!(material_rgb(255), 0x8c4414);
    }
}
