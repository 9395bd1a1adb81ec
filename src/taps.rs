//! Fixed audio filters, designed for the 12.5kHz channel rate.

/// Group delay of `HighpassFir` (samples).
pub const HIGHPASS_DELAY: usize = 148;

// High-pass removing sub-audible CTCSS tones below 300Hz.
impl_fir!(HighpassFir, f32, 297, [
    0.00538494, -0.00593683, -0.00334367, -0.00176582, -0.00080616, -0.00022083, 0.00013836, 0.00036230,
    0.00050517, 0.00060070, 0.00066745, 0.00071739, 0.00075554, 0.00078620, 0.00080927, 0.00082539,
    0.00083344, 0.00083325, 0.00082293, 0.00080191, 0.00076911, 0.00072408, 0.00066598, 0.00059516,
    0.00051150, 0.00041531, 0.00030711, 0.00018858, 0.00006096, -0.00007413, -0.00021457, -0.00035795,
    -0.00050187, -0.00064429, -0.00078131, -0.00091174, -0.00103088, -0.00113849, -0.00122731, -0.00130346,
    -0.00134903, -0.00138837, -0.00138274, -0.00136808, -0.00132470, -0.00124193, -0.00114589, -0.00102274,
    -0.00086788, -0.00068775, -0.00049469, -0.00028093, -0.00004838, 0.00019942, 0.00045010, 0.00070334,
    0.00095601, 0.00120740, 0.00144816, 0.00167289, 0.00187411, 0.00205116, 0.00219992, 0.00231808,
    0.00239806, 0.00243718, 0.00243127, 0.00238125, 0.00228508, 0.00214476, 0.00195844, 0.00172768,
    0.00145244, 0.00113754, 0.00078619, 0.00040442, -0.00000199, -0.00042674, -0.00086377, -0.00130764,
    -0.00174794, -0.00218100, -0.00259257, -0.00297876, -0.00332922, -0.00363319, -0.00389111, -0.00408666,
    -0.00422011, -0.00428483, -0.00427608, -0.00418645, -0.00402034, -0.00377102, -0.00344036, -0.00302894,
    -0.00254360, -0.00198512, -0.00136124, -0.00067891, 0.00005052, 0.00082054, 0.00161886, 0.00243451,
    0.00325165, 0.00405871, 0.00483951, 0.00558127, 0.00626644, 0.00688142, 0.00740917, 0.00783816,
    0.00815328, 0.00834287, 0.00839296, 0.00829556, 0.00804124, 0.00762362, 0.00703606, 0.00627617,
    0.00534188, 0.00423400, 0.00295668, 0.00151518, -0.00008564, -0.00183262, -0.00371890, -0.00572534,
    -0.00784113, -0.01004522, -0.01232156, -0.01464732, -0.01700577, -0.01936973, -0.02172146, -0.02403581,
    -0.02629047, -0.02846175, -0.03053057, -0.03247380, -0.03427217, -0.03590558, -0.03735903, -0.03861503,
    -0.03966227, -0.04048817, -0.04108574, -0.04144585, 0.95843307, -0.04144585, -0.04108574, -0.04048817,
    -0.03966227, -0.03861503, -0.03735903, -0.03590558, -0.03427217, -0.03247380, -0.03053057, -0.02846175,
    -0.02629047, -0.02403581, -0.02172146, -0.01936973, -0.01700577, -0.01464732, -0.01232156, -0.01004522,
    -0.00784113, -0.00572534, -0.00371890, -0.00183262, -0.00008564, 0.00151518, 0.00295668, 0.00423400,
    0.00534188, 0.00627617, 0.00703606, 0.00762362, 0.00804124, 0.00829556, 0.00839296, 0.00834287,
    0.00815328, 0.00783816, 0.00740917, 0.00688142, 0.00626644, 0.00558127, 0.00483951, 0.00405871,
    0.00325165, 0.00243451, 0.00161886, 0.00082054, 0.00005052, -0.00067891, -0.00136124, -0.00198512,
    -0.00254360, -0.00302894, -0.00344036, -0.00377102, -0.00402034, -0.00418645, -0.00427608, -0.00428483,
    -0.00422011, -0.00408666, -0.00389111, -0.00363319, -0.00332922, -0.00297876, -0.00259257, -0.00218100,
    -0.00174794, -0.00130764, -0.00086377, -0.00042674, -0.00000199, 0.00040442, 0.00078619, 0.00113754,
    0.00145244, 0.00172768, 0.00195844, 0.00214476, 0.00228508, 0.00238125, 0.00243127, 0.00243718,
    0.00239806, 0.00231808, 0.00219992, 0.00205116, 0.00187411, 0.00167289, 0.00144816, 0.00120740,
    0.00095601, 0.00070334, 0.00045010, 0.00019942, -0.00004838, -0.00028093, -0.00049469, -0.00068775,
    -0.00086788, -0.00102274, -0.00114589, -0.00124193, -0.00132470, -0.00136808, -0.00138274, -0.00138837,
    -0.00134903, -0.00130346, -0.00122731, -0.00113849, -0.00103088, -0.00091174, -0.00078131, -0.00064429,
    -0.00050187, -0.00035795, -0.00021457, -0.00007413, 0.00006096, 0.00018858, 0.00030711, 0.00041531,
    0.00051150, 0.00059516, 0.00066598, 0.00072408, 0.00076911, 0.00080191, 0.00082293, 0.00083325,
    0.00083344, 0.00082539, 0.00080927, 0.00078620, 0.00075554, 0.00071739, 0.00066745, 0.00060070,
    0.00050517, 0.00036230, 0.00013836, -0.00022083, -0.00080616, -0.00176582, -0.00334367, -0.00593683,
    0.00538494,
]);

// Low-pass limiting audio bandwidth to 4.5kHz.
impl_fir!(LowpassFir, f32, 103, [
    0.00246253, 0.00653798, 0.00120876, -0.00287389, 0.00201971, -0.00020231, -0.00156764, 0.00240512,
    -0.00176244, -0.00011997, 0.00217598, -0.00304036, 0.00192898, 0.00069908, -0.00325112, 0.00393558,
    -0.00197824, -0.00166413, 0.00470662, -0.00494003, 0.00177669, 0.00310013, -0.00655946, 0.00599165,
    -0.00119629, -0.00513856, 0.00886932, -0.00703653, 0.00007751, 0.00798494, -0.01177575, 0.00803340,
    0.00184449, -0.01203789, 0.01558157, -0.00892507, -0.00509551, 0.01811789, -0.02096620, 0.00967502,
    0.01086701, -0.02840958, 0.02996278, -0.01023451, -0.02310694, 0.05094574, -0.05120893, 0.01058206,
    0.06674462, -0.15844736, 0.23238885, 0.73929005, 0.23238885, -0.15844736, 0.06674462, 0.01058206,
    -0.05120893, 0.05094574, -0.02310694, -0.01023451, 0.02996278, -0.02840958, 0.01086701, 0.00967502,
    -0.02096620, 0.01811789, -0.00509551, -0.00892507, 0.01558157, -0.01203789, 0.00184449, 0.00803340,
    -0.01177575, 0.00798494, 0.00007751, -0.00703653, 0.00886932, -0.00513856, -0.00119629, 0.00599165,
    -0.00655946, 0.00310013, 0.00177669, -0.00494003, 0.00470662, -0.00166413, -0.00197824, 0.00393558,
    -0.00325112, 0.00069908, 0.00192898, -0.00304036, 0.00217598, -0.00011997, -0.00176244, 0.00240512,
    -0.00156764, -0.00020231, 0.00201971, -0.00287389, 0.00120876, 0.00653798, 0.00246253,
]);

// FIR approximation of 50us de-emphasis.
impl_fir!(DeemphFir, f32, 101, [
    -0.00051465, -0.00099186, -0.00159733, -0.00227851, -0.00310069, -0.00400507, -0.00506042, -0.00620048,
    -0.00749764, -0.00887676, -0.01041414, -0.01202419, -0.01378760, -0.01560654, -0.01756678, -0.01955631,
    -0.02166702, -0.02377038, -0.02596587, -0.02810578, -0.03029920, -0.03237594, -0.03445746, -0.03634694,
    -0.03818191, -0.03973361, -0.04116047, -0.04219463, -0.04302200, -0.04332560, -0.04332773, -0.04264781,
    -0.04155682, -0.03958890, -0.03708117, -0.03344847, -0.02911980, -0.02333449, -0.01665294, -0.00803967,
    0.00174917, 0.01421623, 0.02829790, 0.04638760, 0.06690555, 0.09427435, 0.12599297, 0.17284975,
    0.23109142, 0.35660140, 0.62006398, 0.35660140, 0.23109142, 0.17284975, 0.12599297, 0.09427435,
    0.06690555, 0.04638760, 0.02829790, 0.01421623, 0.00174917, -0.00803967, -0.01665294, -0.02333449,
    -0.02911980, -0.03344847, -0.03708117, -0.03958890, -0.04155682, -0.04264781, -0.04332773, -0.04332560,
    -0.04302200, -0.04219463, -0.04116047, -0.03973361, -0.03818191, -0.03634694, -0.03445746, -0.03237594,
    -0.03029920, -0.02810578, -0.02596587, -0.02377038, -0.02166702, -0.01955631, -0.01756678, -0.01560654,
    -0.01378760, -0.01202419, -0.01041414, -0.00887676, -0.00749764, -0.00620048, -0.00506042, -0.00400507,
    -0.00310069, -0.00227851, -0.00159733, -0.00099186, -0.00051465,
]);
